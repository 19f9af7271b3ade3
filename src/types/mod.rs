// src/types/mod.rs
//! Validated domain newtypes shared across the engine.

use thiserror::Error;

mod domain_types;
mod ids;

pub use domain_types::*;
pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid API key format: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Invalid field name: {name} - {reason}")]
    InvalidFieldName { name: String, reason: String },

    #[error("Unknown image type '{0}' (expected photo, illustration, vector or all)")]
    UnknownImageType(String),

    #[error("Unknown placement '{0}' (expected before, after or replace)")]
    UnknownPlacement(String),

    #[error("Value out of bounds: {value}, expected {min}..={max}")]
    OutOfBounds { value: u32, min: u32, max: u32 },
}
