// src/store.rs
//! JSON-file record store, used by the command-line runner and tests.
//!
//! The document shape is `{"notes": [{"id": 1, "Front": "...", ...}]}`;
//! field order inside each note is kept on save.

use crate::error::AppError;
use crate::model::Record;
use crate::pipeline::RecordStore;
use crate::types::{FieldName, RecordId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default, Serialize, Deserialize)]
struct NoteDocument {
    #[serde(default)]
    notes: Vec<Record>,
}

/// Records held in memory and optionally backed by a JSON file.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: Option<PathBuf>,
    notes: RwLock<Vec<Record>>,
    dirty: AtomicBool,
    only_missing: Option<FieldName>,
}

impl JsonRecordStore {
    /// Loads the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let document: NoteDocument =
            serde_json::from_str(&content).map_err(|source| AppError::JsonParseError {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("{} notes found in {}", document.notes.len(), path.display());
        Ok(Self {
            path: Some(path.to_path_buf()),
            notes: RwLock::new(document.notes),
            dirty: AtomicBool::new(false),
            only_missing: None,
        })
    }

    /// In-memory store with no backing file.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            path: None,
            notes: RwLock::new(records),
            dirty: AtomicBool::new(false),
            only_missing: None,
        }
    }

    /// Restricts the selection to records whose `field` is empty or absent.
    pub fn selecting_missing(mut self, field: FieldName) -> Self {
        self.only_missing = Some(field);
        self
    }

    /// Snapshot of every record.
    pub fn records(&self) -> Vec<Record> {
        self.notes.read().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Writes the document back if anything changed. Returns whether it wrote.
    pub fn save(&self) -> Result<bool, AppError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        if !self.is_dirty() {
            return Ok(false);
        }
        let document = NoteDocument {
            notes: self.records(),
        };
        let json = serde_json::to_string_pretty(&document).map_err(|e| AppError::InternalError {
            message: format!("Failed to serialize notes: {}", e),
            source: Some(Box::new(e)),
        })?;
        std::fs::write(path, json)?;
        self.dirty.store(false, Ordering::SeqCst);
        log::info!("Saved notes to {}", path.display());
        Ok(true)
    }
}

impl RecordStore for JsonRecordStore {
    fn get_field(&self, record: &RecordId, field: &FieldName) -> Result<String, AppError> {
        let notes = self.notes.read();
        let note = notes
            .iter()
            .find(|n| &n.id == record)
            .ok_or_else(|| AppError::Store(format!("record {} not found", record)))?;
        note.field(field.as_str())
            .map(str::to_string)
            .ok_or_else(|| AppError::FieldMissing {
                record: record.to_string(),
                field: field.to_string(),
            })
    }

    fn set_field(&self, record: &RecordId, field: &FieldName, content: &str) -> Result<(), AppError> {
        let mut notes = self.notes.write();
        let note = notes
            .iter_mut()
            .find(|n| &n.id == record)
            .ok_or_else(|| AppError::Store(format!("record {} not found", record)))?;
        note.fields
            .insert(field.as_str().to_string(), content.to_string());
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn list_selected_records(&self) -> Result<Vec<RecordId>, AppError> {
        let notes = self.notes.read();
        Ok(notes
            .iter()
            .filter(|n| match &self.only_missing {
                Some(field) => n.field(field.as_str()).map_or(true, |c| c.trim().is_empty()),
                None => true,
            })
            .map(|n| n.id.clone())
            .collect())
    }
}
