//! Represents an inventory item and the shapes derived from it.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single inventory record as persisted by a storage backend.
///
/// The same struct maps to a row of the `inventory` table (via `FromRow`) and
/// to an element of the JSON document, so both backends share one layout.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Item {
    /// Server-generated identifier (UUID v4 string). Never changes.
    pub id: String,

    /// Display name, stored trimmed and never empty.
    pub name: String,

    /// Free-form description, empty when not supplied.
    #[serde(default)]
    pub description: String,

    /// Filename of the attached photo inside the photo store, if any.
    #[serde(default)]
    pub photo_path: Option<String>,
}

/// Explicit partial update for an item.
///
/// Absent and empty inputs are both collapsed to `None` ("leave unchanged")
/// when the patch is built, so backends only ever see fields to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ItemPatch {
    /// Build a patch from raw request input.
    ///
    /// - `name` is trimmed; a blank name counts as absent.
    /// - `description` is kept verbatim; only an exactly empty string counts as absent.
    pub fn from_input(name: Option<String>, description: Option<String>) -> Self {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let description = description.filter(|d| !d.is_empty());
        Self { name, description }
    }

    /// True when applying the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    /// Apply the present fields onto `item`.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
    }
}

/// JSON shape returned to clients for a single item.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Absolute or relative URL of the photo endpoint, `null` without a photo.
    pub photo: Option<String>,
}

impl ItemView {
    /// Shape `item` for a response. `base` is the scheme+host prefix used for
    /// the photo URL (empty for a relative URL).
    pub fn from_item(item: Item, base: &str) -> Self {
        let photo = item
            .photo_path
            .as_ref()
            .map(|_| photo_url(base, &item.id));
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            photo,
        }
    }
}

/// URL under which the photo of item `id` is served.
pub fn photo_url(base: &str, id: &str) -> String {
    format!("{}/inventory/{}/photo", base, id)
}
