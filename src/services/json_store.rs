//! JsonFileStore: the whole inventory kept as one JSON array on disk.
//!
//! Every mutation reads the full document, edits it in memory and writes it
//! back through a temporary sibling file that is fsynced and renamed over the
//! original, so readers never see a half-written document. There is no lock:
//! two concurrent rewrites can lose one of the updates (last write wins).

use crate::{
    models::item::{Item, ItemPatch},
    services::repository::{ItemRepository, StorageError, StorageResult},
};
use async_trait::async_trait;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the document at `path`, creating parent directories and an empty
    /// `[]` document when nothing exists yet.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self { path: path.into() };
        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        match fs::metadata(&store.path).await {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                store.persist(&[]).await?;
                debug!("created empty inventory document {}", store.path.display());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StorageResult<Vec<Item>> {
        let raw = fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Write the full document via temp file + fsync + rename.
    async fn persist(&self, items: &[Item]) -> StorageResult<()> {
        let body = serde_json::to_vec_pretty(items)?;
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = write_and_sync(&mut file, &body).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        Ok(())
    }

    /// Load, let `edit` change the document, persist, and hand back what
    /// `edit` returned.
    async fn modify<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Item>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut items = self.load().await?;
        let out = edit(&mut items)?;
        self.persist(&items).await?;
        Ok(out)
    }
}

async fn write_and_sync(file: &mut File, body: &[u8]) -> io::Result<()> {
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await
}

fn position(items: &[Item], id: &str) -> StorageResult<usize> {
    items
        .iter()
        .position(|item| item.id == id)
        .ok_or_else(|| StorageError::NotFound(id.to_string()))
}

#[async_trait]
impl ItemRepository for JsonFileStore {
    async fn list_all(&self) -> StorageResult<Vec<Item>> {
        self.load().await
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Item> {
        let items = self.load().await?;
        let idx = position(&items, id)?;
        Ok(items[idx].clone())
    }

    async fn insert(&self, item: Item) -> StorageResult<Item> {
        self.modify(|items| {
            if items.iter().any(|existing| existing.id == item.id) {
                return Err(StorageError::Conflict(item.id.clone()));
            }
            items.push(item.clone());
            Ok(item)
        })
        .await
    }

    async fn update(&self, id: &str, patch: &ItemPatch) -> StorageResult<Item> {
        if patch.is_empty() {
            // No-op: report the stored item without rewriting the document.
            return self.get_by_id(id).await;
        }
        self.modify(|items| {
            let idx = position(items, id)?;
            patch.apply_to(&mut items[idx]);
            Ok(items[idx].clone())
        })
        .await
    }

    async fn set_photo(&self, id: &str, photo_path: Option<String>) -> StorageResult<Item> {
        self.modify(|items| {
            let idx = position(items, id)?;
            items[idx].photo_path = photo_path;
            Ok(items[idx].clone())
        })
        .await
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.modify(|items| {
            let idx = position(items, id)?;
            items.remove(idx);
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.load().await.map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "json"
    }
}
