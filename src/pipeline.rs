// src/pipeline.rs
//! Host capability traits: what the engine needs from the application
//! that owns the records.
//!
//! Each trait describes a single capability, so a run can be tested with
//! in-memory stand-ins and embedded in any host.

use crate::error::AppError;
use crate::types::{FieldName, RecordId};

/// Read and write access to the host's records.
///
/// Each call is its own transaction; nothing spans records. The engine
/// calls `set_field` from one task at a time, so single-writer hosts need
/// no extra locking.
pub trait RecordStore: Send + Sync {
    /// Current content of `field` on `record`.
    fn get_field(&self, record: &RecordId, field: &FieldName) -> Result<String, AppError>;

    /// Replaces the content of `field` on `record`.
    fn set_field(&self, record: &RecordId, field: &FieldName, content: &str) -> Result<(), AppError>;

    /// Records the user selected, in display order.
    fn list_selected_records(&self) -> Result<Vec<RecordId>, AppError>;
}

/// Storage for media files referenced from field content.
#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores `bytes` under (approximately) `file_name` and returns the
    /// name actually used, which the host may alter to avoid collisions.
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AppError>;
}
