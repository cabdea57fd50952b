use std::fs;
use std::path::{Path, PathBuf};

use crate::io::lock::FileLock;
use crate::io::recovery::atomic_write;
use crate::io::store::{ItemStore, StoreError, apply_upsert, validate_menu_id};
use crate::model::item::{ItemPatch, MenuItem};

/// Item store backed by one JSON file per menu under `<navtree>/menus/`.
///
/// Each write takes the directory lock, reads the current file, changes it and
/// replaces it atomically. A menu without a file is an empty menu.
#[derive(Debug, Clone)]
pub struct FileStore {
    navtree_dir: PathBuf,
}

impl FileStore {
    pub fn new(navtree_dir: impl Into<PathBuf>) -> Self {
        FileStore {
            navtree_dir: navtree_dir.into(),
        }
    }

    pub fn menus_dir(&self) -> PathBuf {
        self.navtree_dir.join("menus")
    }

    pub fn menu_path(&self, menu_id: &str) -> PathBuf {
        self.menus_dir().join(format!("{}.json", menu_id))
    }

    /// Menu ids that have a file on disk, sorted
    pub fn stored_menus(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.menus_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { path: dir, source }),
        };
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn read_items(&self, path: &Path) -> Result<Vec<MenuItem>, StoreError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_items(&self, path: &Path, items: &[MenuItem]) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(self.menus_dir()).map_err(write_err)?;
        let mut json = serde_json::to_string_pretty(items).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        json.push('\n');
        atomic_write(path, json.as_bytes()).map_err(write_err)
    }

    /// Read-modify-write one menu file under the directory lock.
    fn modify<F>(&self, menu_id: &str, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<MenuItem>) -> Result<(), StoreError>,
    {
        validate_menu_id(menu_id)?;
        let _lock = FileLock::acquire_default(&self.navtree_dir)?;
        let path = self.menu_path(menu_id);
        let mut items = self.read_items(&path)?;
        change(&mut items)?;
        self.write_items(&path, &items)?;
        tracing::trace!(menu = menu_id, records = items.len(), "menu file written");
        Ok(())
    }
}

impl ItemStore for FileStore {
    fn list(&self, menu_id: &str) -> Result<Vec<MenuItem>, StoreError> {
        validate_menu_id(menu_id)?;
        self.read_items(&self.menu_path(menu_id))
    }

    fn bulk_upsert(&mut self, menu_id: &str, patches: &[ItemPatch]) -> Result<(), StoreError> {
        self.modify(menu_id, |items| apply_upsert(menu_id, items, patches))
    }

    fn create(&mut self, menu_id: &str, item: &MenuItem) -> Result<(), StoreError> {
        self.modify(menu_id, |items| {
            if items.iter().any(|i| i.id == item.id) {
                return Err(StoreError::Conflict {
                    menu: menu_id.to_string(),
                    id: item.id.clone(),
                });
            }
            items.push(item.clone());
            Ok(())
        })
    }

    fn update(&mut self, menu_id: &str, item: &MenuItem) -> Result<(), StoreError> {
        self.modify(menu_id, |items| {
            let slot = items
                .iter_mut()
                .find(|i| i.id == item.id)
                .ok_or_else(|| StoreError::UnknownItem {
                    menu: menu_id.to_string(),
                    id: item.id.clone(),
                })?;
            *slot = item.clone();
            Ok(())
        })
    }

    fn delete(&mut self, menu_id: &str, id: &str) -> Result<(), StoreError> {
        self.modify(menu_id, |items| {
            let idx = items
                .iter()
                .position(|i| i.id == id)
                .ok_or_else(|| StoreError::UnknownItem {
                    menu: menu_id.to_string(),
                    id: id.to_string(),
                })?;
            items.remove(idx);
            Ok(())
        })
    }
}
