// src/terminal.rs
//! Interactive candidate picker for the command line.

use crate::selection::{CandidatePicker, PickerDecision, SelectionRequest};
use std::io::{BufRead, Write};

/// Lists candidates on stdout and reads the choice from stdin.
///
/// Input is a 1-based candidate number, `s` to skip or `q` to abort the
/// run. End of input counts as abort.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPicker;

impl TerminalPicker {
    pub fn new() -> Self {
        Self
    }
}

/// Parses one line of user input; `None` means the line was not understood.
pub fn parse_decision(line: &str) -> Option<PickerDecision> {
    match line.trim().to_ascii_lowercase().as_str() {
        "s" | "skip" => Some(PickerDecision::Skip),
        "q" | "quit" | "abort" => Some(PickerDecision::Abort),
        other => other
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .map(|n| PickerDecision::Choose(n - 1)),
    }
}

fn render_request(request: &SelectionRequest<'_>) -> String {
    let mut out = format!(
        "\n[{}/{}] Record {}: '{}'\n",
        request.position.0, request.position.1, request.record_id, request.query
    );
    for (i, candidate) in request.candidates.iter().enumerate() {
        out.push_str(&format!(
            "  {}) [{}] {}\n     {}\n",
            i + 1,
            candidate.image_type,
            candidate.preview_url,
            candidate.attribution
        ));
    }
    out.push_str(&format!(
        "Choose 1-{}, s to skip, q to abort: ",
        request.candidates.len()
    ));
    out
}

fn read_line() -> std::io::Result<Option<String>> {
    let mut line = String::new();
    let read = std::io::stdin().lock().read_line(&mut line)?;
    Ok((read > 0).then_some(line))
}

#[async_trait::async_trait]
impl CandidatePicker for TerminalPicker {
    async fn pick(&self, request: &SelectionRequest<'_>) -> PickerDecision {
        let prompt = render_request(request);
        let available = request.candidates.len();
        let mut first = true;

        loop {
            {
                let mut stdout = std::io::stdout().lock();
                let text = if first { prompt.as_str() } else { "Choice: " };
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            first = false;

            let line = match tokio::task::spawn_blocking(read_line).await {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => return PickerDecision::Abort,
                Ok(Err(e)) => {
                    log::error!("Failed to read selection: {}", e);
                    return PickerDecision::Abort;
                }
                Err(e) => {
                    log::error!("Selection input task failed: {}", e);
                    return PickerDecision::Abort;
                }
            };

            match parse_decision(&line) {
                Some(PickerDecision::Choose(index)) if index >= available => {
                    println!("No candidate {}; there are {}.", index + 1, available);
                }
                Some(decision) => return decision,
                None => println!("Type a number, s or q."),
            }
        }
    }
}
