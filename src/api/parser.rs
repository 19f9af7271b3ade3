// src/api/parser.rs
//! Parses search API responses into candidates.
//!
//! Only the fields the engine uses are modelled; unknown fields are ignored
//! so additions on the service side do not break parsing.

use super::client::ApiResponse;
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::AppError;
use crate::model::Candidate;
use crate::types::{ImageType, ValidatedUrl};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "totalHits", default)]
    total_hits: u64,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: u64,
    #[serde(rename = "previewURL")]
    preview_url: String,
    #[serde(rename = "webformatURL")]
    webformat_url: String,
    #[serde(rename = "largeImageURL", default)]
    large_image_url: Option<String>,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    tags: String,
}

/// Parses a successful search response body.
///
/// Returns the candidates in service order; an empty vector means the
/// service had no hits. Hits with unusable URLs are dropped with a warning.
pub fn parse_search_response(response: ApiResponse<String>) -> Result<Vec<Candidate>, AppError> {
    let parsed: SearchResponse = serde_json::from_str(&response.data).map_err(|e| {
        AppError::MalformedResponse(format!(
            "{} (body starts with: {})",
            e,
            preview(&response.data)
        ))
    })?;

    log::debug!(
        "Search response {} from {}: {} total hits, {} returned",
        response.status,
        response.url,
        parsed.total_hits,
        parsed.hits.len()
    );

    Ok(parsed
        .hits
        .into_iter()
        .filter_map(|hit| match candidate_from_hit(hit) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                log::warn!("Dropping search hit: {}", e);
                None
            }
        })
        .collect())
}

fn candidate_from_hit(hit: Hit) -> Result<Candidate, AppError> {
    let preview_url = ValidatedUrl::parse(&hit.preview_url)?;
    let full_url = match hit.large_image_url.as_deref() {
        Some(large) if !large.is_empty() => ValidatedUrl::parse(large)?,
        _ => ValidatedUrl::parse(&hit.webformat_url)?,
    };
    let attribution = if hit.user.trim().is_empty() {
        "Image from Pixabay".to_string()
    } else {
        format!("Image by {} on Pixabay", hit.user.trim())
    };

    Ok(Candidate {
        remote_id: hit.id,
        preview_url,
        full_url,
        image_type: ImageType::from_hit_tag(&hit.kind),
        attribution,
        tags: hit.tags,
    })
}

/// First characters of an error body, for log and error messages.
pub fn preview(body: &str) -> String {
    let mut out: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        out.push('…');
    }
    out
}
