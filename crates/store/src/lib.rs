//! In-memory record store for the SHELF book catalog.
//!
//! The store owns persistence and mutation; the query layer only ever sees
//! immutable snapshots taken with [`RecordStore::snapshot`]. Records are
//! keyed by a monotonically assigned `u64` id, and snapshots iterate in
//! ascending-id (insertion) order, which downstream stable sorts rely on
//! as the tie-break order.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A book as held by the store. `id` is assigned on insert and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub publication_year: i32,
}

/// Payload for creating a book or fully replacing an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub publication_year: i32,
}

/// Errors surfaced by store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("book {id} not found")]
    NotFound { id: u64 },

    #[error("record store lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<u64, BookRecord>,
    next_id: u64,
}

/// Thread-safe in-memory store. Writers take the lock exclusively; readers
/// copy out a point-in-time snapshot and release it immediately.
#[derive(Debug, Default)]
pub struct RecordStore {
    inner: RwLock<Inner>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new book, assigning the next id.
    pub fn insert(&self, book: NewBook) -> Result<BookRecord, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.next_id += 1;
        let record = BookRecord {
            id: inner.next_id,
            title: book.title,
            author: book.author,
            publication_year: book.publication_year,
        };
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    /// Fetch a single record by id.
    pub fn get(&self, id: u64) -> Result<BookRecord, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        inner
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { id })
    }

    /// Fully replace the record at `id`, keeping its id.
    pub fn replace(&self, id: u64, book: NewBook) -> Result<BookRecord, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let slot = inner
            .records
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        slot.title = book.title;
        slot.author = book.author;
        slot.publication_year = book.publication_year;
        Ok(slot.clone())
    }

    /// Remove the record at `id`.
    pub fn remove(&self, id: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id })
    }

    /// Point-in-time copy of all records in ascending-id order.
    pub fn snapshot(&self) -> Result<Vec<BookRecord>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.records.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.records.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
