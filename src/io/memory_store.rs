use std::collections::HashMap;

use crate::io::store::{ItemStore, StoreError, apply_upsert, validate_menu_id};
use crate::model::item::{ItemPatch, MenuItem};

/// In-process store. Backs tests and embedding callers that persist on
/// their own; can be told to fail so error paths are reachable.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    menus: HashMap<String, Vec<MenuItem>>,
    fail_next_upsert: bool,
    offline: bool,
    upserts: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding one menu
    pub fn with_menu(menu_id: &str, items: Vec<MenuItem>) -> Self {
        let mut store = Self::new();
        store.menus.insert(menu_id.to_string(), items);
        store
    }

    /// Make the next `bulk_upsert` fail without touching any record.
    pub fn fail_next_upsert(&mut self) {
        self.fail_next_upsert = true;
    }

    /// While offline every call fails, reads included.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Number of `bulk_upsert` calls that reached the store
    pub fn upsert_count(&self) -> usize {
        self.upserts
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn unknown(menu_id: &str, id: &str) -> StoreError {
        StoreError::UnknownItem {
            menu: menu_id.to_string(),
            id: id.to_string(),
        }
    }
}

impl ItemStore for MemoryStore {
    fn list(&self, menu_id: &str) -> Result<Vec<MenuItem>, StoreError> {
        validate_menu_id(menu_id)?;
        self.check_online()?;
        Ok(self.menus.get(menu_id).cloned().unwrap_or_default())
    }

    fn bulk_upsert(&mut self, menu_id: &str, patches: &[ItemPatch]) -> Result<(), StoreError> {
        validate_menu_id(menu_id)?;
        self.check_online()?;
        self.upserts += 1;
        if std::mem::take(&mut self.fail_next_upsert) {
            return Err(StoreError::Unavailable("injected upsert failure".into()));
        }
        let items = self.menus.entry(menu_id.to_string()).or_default();
        apply_upsert(menu_id, items, patches)
    }

    fn create(&mut self, menu_id: &str, item: &MenuItem) -> Result<(), StoreError> {
        validate_menu_id(menu_id)?;
        self.check_online()?;
        let items = self.menus.entry(menu_id.to_string()).or_default();
        if items.iter().any(|i| i.id == item.id) {
            return Err(StoreError::Conflict {
                menu: menu_id.to_string(),
                id: item.id.clone(),
            });
        }
        items.push(item.clone());
        Ok(())
    }

    fn update(&mut self, menu_id: &str, item: &MenuItem) -> Result<(), StoreError> {
        validate_menu_id(menu_id)?;
        self.check_online()?;
        let slot = self
            .menus
            .get_mut(menu_id)
            .and_then(|items| items.iter_mut().find(|i| i.id == item.id))
            .ok_or_else(|| Self::unknown(menu_id, &item.id))?;
        *slot = item.clone();
        Ok(())
    }

    fn delete(&mut self, menu_id: &str, id: &str) -> Result<(), StoreError> {
        validate_menu_id(menu_id)?;
        self.check_online()?;
        let items = self
            .menus
            .get_mut(menu_id)
            .ok_or_else(|| Self::unknown(menu_id, id))?;
        let idx = items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Self::unknown(menu_id, id))?;
        items.remove(idx);
        Ok(())
    }
}
