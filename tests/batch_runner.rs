// tests/batch_runner.rs
//! End-to-end runs of `BatchRunner` against in-memory collaborators.

mod common;

use cardpix::{
    BatchRunner, DownloadedImage, FieldName, ImageDownloader, ImageType, JsonRecordStore,
    PlacementPolicy, Record, RecordId, RecordStore, RunConfig, RunHalt, RunOutcome, SkipReason,
    ValidatedUrl,
};
use common::{config, ids, records, Answer, MemoryMedia, ScriptedSearch};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const WORDS: [&str; 10] = [
    "chat", "chien", "pomme", "maison", "soleil", "lune", "arbre", "fleur", "voiture", "livre",
];

fn image_field() -> FieldName {
    FieldName::new("Image").unwrap()
}

fn runner(
    config: RunConfig,
    search: &Arc<ScriptedSearch>,
    store: &Arc<JsonRecordStore>,
) -> BatchRunner {
    BatchRunner::new(config, search.clone(), store.clone())
}

#[tokio::test]
async fn every_record_gets_the_first_candidate() {
    let search = Arc::new(ScriptedSearch::new());
    let store = Arc::new(JsonRecordStore::from_records(records(&WORDS[..3])));

    let report = runner(config(), &search, &store).run(&ids(3)).await;

    assert_eq!(report.stats.succeeded, 3);
    assert!(!report.is_halted());
    let order: Vec<_> = report.entries.iter().map(|e| e.record_id.clone()).collect();
    assert_eq!(order, ids(3));

    let content = store.get_field(&RecordId::from(2), &image_field()).unwrap();
    assert!(content.contains("https://pixabay.com/get/chien-0_1280.jpg"), "{}", content);
    assert!(content.contains("Image by user0 on Pixabay"));
    assert_eq!(
        report.outcome_of(&RecordId::from(2)),
        Some(&RunOutcome::Success {
            new_content: content
        })
    );
}

#[tokio::test]
async fn auth_failure_halts_the_run_at_that_record() {
    let search = Arc::new(ScriptedSearch::new().answer("maison", Answer::Unauthorized));
    let store = Arc::new(JsonRecordStore::from_records(records(&WORDS)));

    let report = runner(config(), &search, &store).run(&ids(10)).await;

    assert_eq!(report.entries.len(), 4);
    for id in 1..=3 {
        assert!(report.outcome_of(&RecordId::from(id)).unwrap().is_success());
    }
    assert!(report.outcome_of(&RecordId::from(4)).unwrap().is_failed());
    assert!(report.outcome_of(&RecordId::from(5)).is_none());
    assert!(matches!(report.halt, Some(RunHalt::Auth { .. })));

    // Writes before the halt are kept; nothing after it is touched.
    assert!(!store
        .get_field(&RecordId::from(3), &image_field())
        .unwrap()
        .is_empty());
    for id in 4..=10 {
        assert_eq!(
            store.get_field(&RecordId::from(id), &image_field()).unwrap(),
            ""
        );
    }
}

#[tokio::test]
async fn no_results_skips_only_that_record() {
    let search = Arc::new(ScriptedSearch::new().answer("lune", Answer::NoResults));
    let store = Arc::new(JsonRecordStore::from_records(records(&WORDS)));

    let report = runner(config(), &search, &store).run(&ids(10)).await;

    assert_eq!(report.entries.len(), 10);
    assert_eq!(
        report.outcome_of(&RecordId::from(6)),
        Some(&RunOutcome::Skipped(SkipReason::NoResults {
            query: "lune".to_string()
        }))
    );
    assert_eq!(report.stats.succeeded, 9);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.stats.failed, 0);
}

#[tokio::test]
async fn record_level_failures_do_not_stop_the_run() {
    let search = Arc::new(ScriptedSearch::new().answer("chien", Answer::Throttled));
    let mut notes = records(&["chat", "chien", "<br>&nbsp;", "pomme"]);
    notes.push(Record::new(5).with_field("Image", ""));
    let store = Arc::new(JsonRecordStore::from_records(notes));

    let report = runner(config(), &search, &store).run(&ids(5)).await;

    assert_eq!(report.entries.len(), 5);
    match report.outcome_of(&RecordId::from(2)) {
        Some(RunOutcome::Failed { reason }) => assert!(reason.contains("rate limit"), "{}", reason),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(
        report.outcome_of(&RecordId::from(3)),
        Some(&RunOutcome::Skipped(SkipReason::EmptySource))
    );
    match report.outcome_of(&RecordId::from(5)) {
        Some(RunOutcome::Failed { reason }) => assert!(reason.contains("Source"), "{}", reason),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(report.outcome_of(&RecordId::from(4)).unwrap().is_success());
}

#[tokio::test]
async fn repeated_queries_are_searched_once() {
    let search = Arc::new(ScriptedSearch::new());
    let store = Arc::new(JsonRecordStore::from_records(records(&[
        "chat",
        "<i>chat</i>",
        "chien",
        "  chat ",
    ])));

    let report = runner(config(), &search, &store).run(&ids(4)).await;

    assert_eq!(report.stats.succeeded, 4);
    assert_eq!(search.call_count(), 2);
    assert_eq!(report.cache.misses, 2);
    assert_eq!(report.cache.hits, 2);
}

#[tokio::test]
async fn falls_back_to_photos_when_no_illustrations() {
    let search = Arc::new(
        ScriptedSearch::new().answer_for("soleil", ImageType::Illustration, Answer::NoResults),
    );
    let store = Arc::new(JsonRecordStore::from_records(records(&["soleil", "lune"])));
    let config = RunConfig {
        image_type: ImageType::Illustration,
        fallback_image_type: Some(ImageType::Photo),
        ..config()
    };

    let report = runner(config, &search, &store).run(&ids(2)).await;

    assert_eq!(report.stats.succeeded, 2);
    let calls = search.calls();
    assert!(calls.contains(&("soleil".to_string(), ImageType::Illustration)));
    assert!(calls.contains(&("soleil".to_string(), ImageType::Photo)));
    assert!(!calls.contains(&("lune".to_string(), ImageType::Photo)));
}

#[tokio::test]
async fn filled_targets_are_skipped_unless_asked() {
    let search = Arc::new(ScriptedSearch::new());
    let notes = vec![
        Record::new(1)
            .with_field("Source", "chat")
            .with_field("Image", "<img src=\"old.jpg\">"),
        Record::new(2).with_field("Source", "chien"),
    ];

    let store = Arc::new(JsonRecordStore::from_records(notes.clone()));
    let report = runner(config(), &search, &store).run(&ids(2)).await;
    assert_eq!(
        report.outcome_of(&RecordId::from(1)),
        Some(&RunOutcome::Skipped(SkipReason::AlreadyFilled))
    );
    // A target field the record lacks is created.
    assert!(report.outcome_of(&RecordId::from(2)).unwrap().is_success());
    assert_eq!(search.call_count(), 1);

    let store = Arc::new(JsonRecordStore::from_records(notes));
    let config = RunConfig {
        skip_filled: false,
        ..config()
    };
    let report = runner(config, &search, &store).run(&ids(2)).await;
    assert_eq!(report.stats.succeeded, 2);
    let content = store.get_field(&RecordId::from(1), &image_field()).unwrap();
    assert!(content.starts_with("<img src=\"old.jpg\"><br><div class=\"cardpix\">"));
}

#[tokio::test]
async fn placement_policies_shape_the_field() {
    let search = Arc::new(ScriptedSearch::new());
    let notes = vec![Record::new(1)
        .with_field("Source", "chat")
        .with_field("Image", "ancien contenu")];

    for (policy, keeps_original) in [
        (PlacementPolicy::Before, true),
        (PlacementPolicy::After, true),
        (PlacementPolicy::Replace, false),
    ] {
        let store = Arc::new(JsonRecordStore::from_records(notes.clone()));
        let config = RunConfig {
            placement: policy,
            skip_filled: false,
            ..config()
        };
        let report = runner(config, &search, &store).run(&ids(1)).await;
        assert_eq!(report.stats.succeeded, 1, "{:?}", policy);

        let content = store.get_field(&RecordId::from(1), &image_field()).unwrap();
        assert_eq!(content.contains("ancien contenu"), keeps_original, "{:?}", policy);
        match policy {
            PlacementPolicy::Before => assert!(content.ends_with("<br>ancien contenu")),
            PlacementPolicy::After => assert!(content.starts_with("ancien contenu<br>")),
            PlacementPolicy::Replace => assert!(content.starts_with("<div class=\"cardpix\">")),
        }
    }
}

#[tokio::test]
async fn replace_overwrites_filled_fields_with_default_settings() {
    let search = Arc::new(ScriptedSearch::new());
    let store = Arc::new(JsonRecordStore::from_records(vec![Record::new(1)
        .with_field("Source", "chat")
        .with_field("Image", "old content")]));
    let config = RunConfig {
        placement: PlacementPolicy::Replace,
        ..config()
    };
    assert!(config.skip_filled);

    let report = runner(config, &search, &store).run(&ids(1)).await;

    assert!(report.outcome_of(&RecordId::from(1)).unwrap().is_success());
    assert_eq!(search.call_count(), 1);
    let content = store.get_field(&RecordId::from(1), &image_field()).unwrap();
    assert!(!content.contains("old content"));
    assert!(content.starts_with("<div class=\"cardpix\">"));
}

#[tokio::test]
async fn run_selected_uses_the_store_order() {
    let search = Arc::new(ScriptedSearch::new());
    let notes = vec![
        Record::new(30).with_field("Source", "c").with_field("Image", ""),
        Record::new(10)
            .with_field("Source", "a")
            .with_field("Image", "<img>"),
        Record::new(20).with_field("Source", "b").with_field("Image", ""),
    ];
    let store = Arc::new(JsonRecordStore::from_records(notes).selecting_missing(image_field()));

    let report = runner(config(), &search, &store).run_selected().await;

    let order: Vec<_> = report.entries.iter().map(|e| e.record_id.clone()).collect();
    assert_eq!(order, vec![RecordId::from(30), RecordId::from(20)]);
}

#[tokio::test]
async fn prefetching_keeps_input_order() {
    let search = Arc::new(ScriptedSearch::new().with_delay(std::time::Duration::from_millis(5)));
    let store = Arc::new(JsonRecordStore::from_records(records(&WORDS)));
    let config = RunConfig {
        concurrency: 4,
        ..config()
    };

    let report = runner(config, &search, &store).run(&ids(10)).await;

    let order: Vec<_> = report.entries.iter().map(|e| e.record_id.clone()).collect();
    assert_eq!(order, ids(10));
    assert_eq!(report.stats.succeeded, 10);
}

struct FakeDownloader;

#[async_trait::async_trait]
impl ImageDownloader for FakeDownloader {
    async fn download(&self, _url: &ValidatedUrl) -> Result<DownloadedImage, cardpix::AppError> {
        Ok(DownloadedImage {
            bytes: vec![0xFF, 0xD8, 0xFF],
            content_type: "image/jpeg".to_string(),
        })
    }
}

#[tokio::test]
async fn downloaded_images_are_embedded_by_local_name() {
    let search = Arc::new(ScriptedSearch::new());
    let store = Arc::new(JsonRecordStore::from_records(records(&["pomme verte"])));
    let media = Arc::new(MemoryMedia::default());

    let report = runner(config(), &search, &store)
        .with_media(Arc::new(FakeDownloader), media.clone())
        .run(&ids(1))
        .await;

    assert_eq!(report.stats.succeeded, 1);
    let files = media.files.lock().clone();
    assert_eq!(files.len(), 1);
    let (name, size) = &files[0];
    assert!(name.starts_with("cardpix_pomme_verte_") && name.ends_with(".jpg"), "{}", name);
    assert_eq!(*size, 3);

    let content = store.get_field(&RecordId::from(1), &image_field()).unwrap();
    assert!(content.contains(&format!("src=\"{}\"", name)));
    assert!(!content.contains("pixabay.com/get"));
}
