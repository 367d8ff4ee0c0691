//! The `ItemRepository` trait: the persistence contract shared by every
//! storage backend, plus the errors those backends report.

use crate::models::item::{Item, ItemPatch};
use async_trait::async_trait;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("item `{0}` not found")]
    NotFound(String),
    #[error("item `{0}` already exists")]
    Conflict(String),
    #[error("nothing to update")]
    EmptyUpdate,
    #[error("invalid photo filename")]
    InvalidPhotoName,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence contract for inventory items.
///
/// Every mutating call is durable by the time it returns: the next read from
/// any handle observes the new state. Nothing here serializes concurrent
/// writers; that is left to the medium.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// All items, in insertion order.
    async fn list_all(&self) -> StorageResult<Vec<Item>>;

    /// A single item, or `NotFound`.
    async fn get_by_id(&self, id: &str) -> StorageResult<Item>;

    /// Store a new item. Fails with `Conflict` when the id is taken.
    async fn insert(&self, item: Item) -> StorageResult<Item>;

    /// Overwrite the fields present in `patch` and return the stored item.
    ///
    /// What an empty patch does is backend-specific: the document store treats
    /// it as a no-op, the relational store rejects it with `EmptyUpdate`.
    async fn update(&self, id: &str, patch: &ItemPatch) -> StorageResult<Item>;

    /// Replace the photo reference of an item.
    async fn set_photo(&self, id: &str, photo_path: Option<String>) -> StorageResult<Item>;

    /// Remove an item permanently.
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Cheap round-trip to the medium, used by readiness checks.
    async fn ping(&self) -> StorageResult<()>;

    /// Short backend name for logs and readiness output.
    fn backend_name(&self) -> &'static str;
}
