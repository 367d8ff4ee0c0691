//! InventoryService: the inventory operations, composing an
//! `ItemRepository` with the `PhotoStore`.
//!
//! Validation happens here, before any storage call. Multi-step sequences
//! (photo replacement, delete) are plain best-effort sequences with no
//! transaction around them.

use crate::{
    models::item::{Item, ItemPatch},
    services::{
        photo_store::{PHOTO_EXTENSION, PhotoStore},
        repository::{ItemRepository, StorageError},
    },
};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::File;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("{0}")]
    Validation(String),
    #[error("item `{0}` not found")]
    ItemNotFound(String),
    #[error("photo for item `{0}` not found")]
    PhotoNotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Input of the register operation, as collected from the upload form.
#[derive(Debug, Default, Clone)]
pub struct NewItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub photo: Option<Bytes>,
}

#[derive(Clone)]
pub struct InventoryService {
    repo: Arc<dyn ItemRepository>,
    photos: PhotoStore,
}

impl InventoryService {
    pub fn new(repo: Arc<dyn ItemRepository>, photos: PhotoStore) -> Self {
        Self { repo, photos }
    }

    pub fn repository(&self) -> &dyn ItemRepository {
        self.repo.as_ref()
    }

    pub fn photos(&self) -> &PhotoStore {
        &self.photos
    }

    /// Turn the repository's `NotFound` into the item-level error.
    fn item_error(id: &str) -> impl FnOnce(StorageError) -> InventoryError + '_ {
        move |err| match err {
            StorageError::NotFound(_) => InventoryError::ItemNotFound(id.to_string()),
            other => InventoryError::Storage(other),
        }
    }

    /// Copy of `item` whose photo reference is dropped when the file is gone.
    /// The stored record is left as it is.
    async fn with_live_photo(&self, mut item: Item) -> Item {
        if let Some(name) = item.photo_path.as_deref() {
            if !self.photos.exists(name).await {
                warn!("item {} references missing photo {}", item.id, name);
                item.photo_path = None;
            }
        }
        item
    }

    /// Remove a photo file, logging instead of failing.
    async fn discard_photo(&self, filename: &str) {
        if let Err(err) = self.photos.delete(filename).await {
            warn!("could not remove photo {}: {}", filename, err);
        }
    }

    /// Register a new item. The name is checked before anything is stored.
    pub async fn register(&self, input: NewItem) -> InventoryResult<Item> {
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| InventoryError::Validation("inventory_name is required".into()))?
            .to_string();

        let photo_path = match input.photo.filter(|bytes| !bytes.is_empty()) {
            Some(bytes) => Some(self.photos.save(bytes, PHOTO_EXTENSION).await?),
            None => None,
        };

        let item = Item {
            id: Uuid::new_v4().to_string(),
            name,
            description: input.description.unwrap_or_default(),
            photo_path: photo_path.clone(),
        };

        match self.repo.insert(item).await {
            Ok(stored) => {
                info!("registered item {} ({})", stored.id, stored.name);
                Ok(stored)
            }
            Err(err) => {
                if let Some(name) = photo_path.as_deref() {
                    self.discard_photo(name).await;
                }
                Err(err.into())
            }
        }
    }

    pub async fn list(&self) -> InventoryResult<Vec<Item>> {
        let items = self.repo.list_all().await?;
        let mut live = Vec::with_capacity(items.len());
        for item in items {
            live.push(self.with_live_photo(item).await);
        }
        Ok(live)
    }

    pub async fn get(&self, id: &str) -> InventoryResult<Item> {
        let item = self.repo.get_by_id(id).await.map_err(Self::item_error(id))?;
        Ok(self.with_live_photo(item).await)
    }

    /// Exact-id lookup for the search endpoints; unknown or missing ids are `None`.
    pub async fn find(&self, id: Option<&str>) -> InventoryResult<Option<Item>> {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        match self.get(id).await {
            Ok(item) => Ok(Some(item)),
            Err(InventoryError::ItemNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn update(&self, id: &str, patch: ItemPatch) -> InventoryResult<Item> {
        let item = self
            .repo
            .update(id, &patch)
            .await
            .map_err(Self::item_error(id))?;
        Ok(self.with_live_photo(item).await)
    }

    /// Delete the photo file (best-effort), then the record.
    pub async fn delete(&self, id: &str) -> InventoryResult<()> {
        let item = self.repo.get_by_id(id).await.map_err(Self::item_error(id))?;
        if let Some(name) = item.photo_path.as_deref() {
            self.discard_photo(name).await;
        }
        self.repo.delete(id).await.map_err(Self::item_error(id))?;
        info!("deleted item {}", id);
        Ok(())
    }

    /// Open the photo of an item for streaming.
    pub async fn open_photo(&self, id: &str) -> InventoryResult<File> {
        let item = self.repo.get_by_id(id).await.map_err(Self::item_error(id))?;
        let name = item
            .photo_path
            .ok_or_else(|| InventoryError::PhotoNotFound(id.to_string()))?;
        self.photos.open_photo(&name).await.map_err(|err| match err {
            StorageError::NotFound(_) => InventoryError::PhotoNotFound(id.to_string()),
            other => InventoryError::Storage(other),
        })
    }

    /// Replace the photo of an item.
    ///
    /// The new upload (if any) is stored and recorded first, then the previous
    /// file is removed best-effort. Without an upload the reference is cleared.
    /// Concurrent replacements of the same item can leave an orphaned file.
    pub async fn replace_photo(&self, id: &str, photo: Option<Bytes>) -> InventoryResult<Item> {
        let current = self.repo.get_by_id(id).await.map_err(Self::item_error(id))?;

        let new_path = match photo.filter(|bytes| !bytes.is_empty()) {
            Some(bytes) => Some(self.photos.save(bytes, PHOTO_EXTENSION).await?),
            None => None,
        };

        let updated = match self.repo.set_photo(id, new_path.clone()).await {
            Ok(item) => item,
            Err(err) => {
                if let Some(name) = new_path.as_deref() {
                    self.discard_photo(name).await;
                }
                return Err(Self::item_error(id)(err));
            }
        };

        if let Some(old) = current.photo_path.as_deref() {
            self.discard_photo(old).await;
        }
        Ok(updated)
    }
}
