use std::path::PathBuf;

use crate::io::lock::LockError;
use crate::model::item::{ItemPatch, MenuItem};

/// Error type for item store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid menu id {0:?}: use letters, digits, '-' or '_'")]
    InvalidMenuId(String),
    #[error("menu {menu} has no item {id}")]
    UnknownItem { menu: String, id: String },
    #[error("menu {menu} already has an item {id}")]
    Conflict { menu: String, id: String },
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The persistence contract the editor talks to.
///
/// Every call is scoped to one menu. `bulk_upsert` is all-or-nothing: when it
/// returns an error, no record was changed.
pub trait ItemStore {
    fn list(&self, menu_id: &str) -> Result<Vec<MenuItem>, StoreError>;

    /// Update the structural fields of existing records.
    fn bulk_upsert(&mut self, menu_id: &str, patches: &[ItemPatch]) -> Result<(), StoreError>;

    fn create(&mut self, menu_id: &str, item: &MenuItem) -> Result<(), StoreError>;

    /// Replace a whole record.
    fn update(&mut self, menu_id: &str, item: &MenuItem) -> Result<(), StoreError>;

    fn delete(&mut self, menu_id: &str, id: &str) -> Result<(), StoreError>;
}

/// Menu ids become file names, so keep them to a safe alphabet.
pub fn validate_menu_id(menu_id: &str) -> Result<(), StoreError> {
    let ok = !menu_id.is_empty()
        && menu_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidMenuId(menu_id.to_string()))
    }
}

/// Apply patches to a record list, failing before any change if one
/// names a missing record.
pub(crate) fn apply_upsert(
    menu_id: &str,
    items: &mut [MenuItem],
    patches: &[ItemPatch],
) -> Result<(), StoreError> {
    let mut targets = Vec::with_capacity(patches.len());
    for patch in patches {
        let idx = items
            .iter()
            .position(|item| item.id == patch.id)
            .ok_or_else(|| StoreError::UnknownItem {
                menu: menu_id.to_string(),
                id: patch.id.clone(),
            })?;
        targets.push(idx);
    }
    for (idx, patch) in targets.into_iter().zip(patches) {
        patch.apply_to(&mut items[idx]);
    }
    Ok(())
}
