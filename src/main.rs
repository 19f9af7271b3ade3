// src/main.rs

use cardpix::{
    AppError, BatchRunner, CommandLineInput, DirectoryMediaStore, JsonRecordStore,
    PixabayHttpClient, RequestLimiter, RunConfig, RunHalt, RunReport, TerminalPicker,
};
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use std::sync::Arc;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("cardpix.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Loads the notes, runs the batch and writes changes back.
async fn execute_run(config: RunConfig) -> Result<RunReport, AppError> {
    let store = JsonRecordStore::load(&config.notes_file)?;
    let store = if config.skips_filled() {
        store.selecting_missing(config.target_field.clone())
    } else {
        store
    };
    let store = Arc::new(store);

    let limiter = Arc::new(RequestLimiter::new(config.min_request_interval));
    let client = Arc::new(PixabayHttpClient::new(
        config.api_key.clone(),
        config.client_settings(),
        limiter,
    )?);

    let interactive = config.interactive;
    let download = config.download;
    let media_dir = config.media_dir.clone();

    let mut runner = BatchRunner::new(config, client.clone(), store.clone());
    if interactive {
        runner = runner.with_picker(Arc::new(TerminalPicker::new()));
    }
    if download {
        log::info!("Images will be saved to {}", media_dir.display());
        runner = runner.with_media(client, Arc::new(DirectoryMediaStore::new(media_dir)));
    }

    let report = runner.run_selected().await;

    // Writes made before a halt are kept.
    if store.save()? {
        println!("✓ Notes saved");
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = RunConfig::resolve(cli)?;
    if config.placement.is_destructive() {
        eprintln!("⚠️  Placement 'replace' discards the existing content of the target field.");
    }

    let report = execute_run(config).await?;
    println!("{}", report.summary());

    match &report.halt {
        Some(RunHalt::Auth { message }) => Err(AppError::Auth {
            message: message.clone(),
        }
        .into()),
        Some(RunHalt::Store { message }) => Err(AppError::Store(message.clone()).into()),
        Some(RunHalt::Aborted) | None => Ok(()),
    }
}
