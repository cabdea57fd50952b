use std::path::PathBuf;

use serde::Serialize;

use crate::io::links::LinkResolver;
use crate::io::recovery;
use crate::io::store::{ItemStore, StoreError};
use crate::model::config::{DeletePolicy, RelocationConfig};
use crate::model::item::{ItemPatch, LinkTarget, MenuItem};
use crate::model::menu::{Menu, TreeNode};
use crate::ops::check::{self, CheckResult};
use crate::ops::item_ops::{self, ItemError, NewItem};
use crate::ops::rank::diff;
use crate::ops::relocate::{self, Gesture, Placement, RelocateError, Rejection, Relocation};
use crate::ops::tree::{self, VisualRow};

/// Error type for editor operations other than `save`
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Relocate(#[from] RelocateError),
    #[error(transparent)]
    Item(#[from] ItemError),
}

/// A save the store refused. The staged changes are gone either way.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The menu was re-read from the store
    #[error("save failed, menu reloaded from store: {source}")]
    Rejected {
        source: StoreError,
        discarded: Vec<ItemPatch>,
    },
    /// The re-read failed too; the menu is back at the last saved state
    #[error("save failed ({source}) and reload failed ({reload}); showing last saved menu")]
    ReloadFailed {
        source: StoreError,
        reload: StoreError,
        discarded: Vec<ItemPatch>,
    },
}

impl SaveError {
    pub fn discarded(&self) -> &[ItemPatch] {
        match self {
            SaveError::Rejected { discarded, .. } | SaveError::ReloadFailed { discarded, .. } => {
                discarded
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub patches: Vec<ItemPatch>,
}

impl SaveReport {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Records a delete removed and the structure it wrote alongside
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub removed: Vec<String>,
    pub saved: SaveReport,
}

/// What a gesture did, in a shape the presentation layer can render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocateOutcome {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

/// Editing session for one menu.
///
/// Structural changes (relocations, repairs) are staged locally and sent as
/// one bulk upsert by `save`. Record creation and payload edits go to the
/// store immediately. A deletion commits at once, staged structure included.
pub struct Editor<S: ItemStore> {
    store: S,
    menu_id: String,
    menu: Menu,
    /// The menu as last read from or written to the store
    baseline: Menu,
    rules: RelocationConfig,
    id_prefix: String,
    recovery_dir: Option<PathBuf>,
}

impl<S: ItemStore> Editor<S> {
    /// Fetch a menu and open it for editing.
    pub fn load(store: S, menu_id: &str, rules: RelocationConfig) -> Result<Self, StoreError> {
        let menu = Menu::from_items(store.list(menu_id)?);
        tracing::debug!(menu = menu_id, items = menu.len(), "menu loaded");
        Ok(Editor {
            store,
            menu_id: menu_id.to_string(),
            baseline: menu.clone(),
            menu,
            rules,
            id_prefix: menu_id.to_string(),
            recovery_dir: None,
        })
    }

    /// Record discarded saves, deletions and repairs in this directory's
    /// recovery log.
    pub fn with_recovery_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recovery_dir = Some(dir.into());
        self
    }

    /// Prefix for generated item ids (default: the menu id)
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    pub fn menu_id(&self) -> &str {
        &self.menu_id
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn rules(&self) -> &RelocationConfig {
        &self.rules
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn forest(&self) -> Vec<TreeNode> {
        tree::build_tree(&self.menu)
    }

    /// Forest with inactive items and everything under them removed
    pub fn active_forest(&self) -> Vec<TreeNode> {
        tree::active_forest(&self.menu)
    }

    pub fn visual_order(&self) -> Vec<VisualRow> {
        tree::visual_order(&self.forest())
    }

    pub fn check(&self) -> CheckResult {
        check::check_menu(&self.menu, &self.rules)
    }

    // -----------------------------------------------------------------------
    // Staged structure
    // -----------------------------------------------------------------------

    /// Apply a gesture to the local menu. A rejected gesture changes nothing.
    pub fn relocate(&mut self, gesture: &Gesture) -> Result<RelocateOutcome, EditorError> {
        let relocation = relocate::relocate(&self.menu, gesture, &self.rules)?;
        Ok(self.stage(relocation))
    }

    /// Stage an explicit move to `parent_id` at `index`.
    pub fn place(
        &mut self,
        item_id: &str,
        parent_id: Option<&str>,
        index: usize,
    ) -> Result<RelocateOutcome, EditorError> {
        let relocation = relocate::place(&self.menu, item_id, parent_id, index, &self.rules)?;
        Ok(self.stage(relocation))
    }

    fn stage(&mut self, relocation: Relocation) -> RelocateOutcome {
        match relocation {
            Relocation::Applied { menu, placement } => {
                self.menu = menu;
                RelocateOutcome {
                    applied: true,
                    rejection: None,
                    placement: Some(placement),
                }
            }
            Relocation::Rejected(rejection) => RelocateOutcome {
                applied: false,
                rejection: Some(rejection),
                placement: None,
            },
        }
    }

    /// Stage a repair of the stored structure. Returns the number of records
    /// it rewrites.
    pub fn repair(&mut self) -> usize {
        let repaired = check::repair(&self.menu);
        let patches = diff(&self.menu, &repaired);
        if patches.is_empty() {
            return 0;
        }
        if let Some(dir) = &self.recovery_dir {
            let before: Vec<MenuItem> = patches
                .iter()
                .filter_map(|p| self.menu.get(&p.id).cloned())
                .collect();
            recovery::log_repair(dir, &self.menu_id, &before);
        }
        self.menu = repaired;
        patches.len()
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending_changes().is_empty()
    }

    /// Patches `save` would send right now
    pub fn pending_changes(&self) -> Vec<ItemPatch> {
        diff(&self.baseline, &self.menu)
    }

    /// Send staged changes as one bulk upsert.
    ///
    /// On failure the staged changes are dropped and the menu is re-read from
    /// the store; the local copy never wins over the store.
    pub fn save(&mut self) -> Result<SaveReport, SaveError> {
        let patches = self.pending_changes();
        if patches.is_empty() {
            return Ok(SaveReport::default());
        }

        let source = match self.store.bulk_upsert(&self.menu_id, &patches) {
            Ok(()) => {
                self.baseline = self.menu.clone();
                tracing::info!(menu = %self.menu_id, patches = patches.len(), "menu saved");
                return Ok(SaveReport { patches });
            }
            Err(e) => e,
        };

        tracing::warn!(
            menu = %self.menu_id,
            error = %source,
            discarded = patches.len(),
            "save failed; discarding staged changes"
        );
        if let Some(dir) = &self.recovery_dir {
            recovery::log_discarded_save(dir, &self.menu_id, &patches, &source.to_string());
        }

        match self.store.list(&self.menu_id) {
            Ok(items) => {
                self.menu = Menu::from_items(items);
                self.baseline = self.menu.clone();
                Err(SaveError::Rejected {
                    source,
                    discarded: patches,
                })
            }
            Err(reload) => {
                tracing::warn!(menu = %self.menu_id, error = %reload, "reload after failed save failed");
                self.menu = self.baseline.clone();
                Err(SaveError::ReloadFailed {
                    source,
                    reload,
                    discarded: patches,
                })
            }
        }
    }

    /// Drop staged changes
    pub fn discard(&mut self) {
        self.menu = self.baseline.clone();
    }

    /// Re-read the menu from the store, dropping staged changes.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let menu = Menu::from_items(self.store.list(&self.menu_id)?);
        self.baseline = menu.clone();
        self.menu = menu;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Written through
    // -----------------------------------------------------------------------

    /// Create an item at the end of its sibling group.
    pub fn add_item(&mut self, new: NewItem) -> Result<MenuItem, EditorError> {
        let mut next = self.menu.clone();
        let item = item_ops::add_item(&mut next, new, &self.id_prefix)?;
        self.store.create(&self.menu_id, &item)?;
        self.menu = next;
        self.baseline.insert(item.clone());
        tracing::info!(menu = %self.menu_id, item = %item.id, "item created");
        Ok(item)
    }

    /// Delete an item and commit the result.
    ///
    /// The removal and the rank shifts it causes are written together with
    /// everything already staged, so the store never holds a dangling parent
    /// or a rank gap. If any step fails, the deleted records are recreated and
    /// the menu is re-read from the store.
    pub fn delete_item(&mut self, id: &str, policy: DeletePolicy) -> Result<DeleteReport, EditorError> {
        let mut next = self.menu.clone();
        let removed = item_ops::delete_item(&mut next, id, policy)?;

        let mut saved = self.baseline.clone();
        for gone in &removed {
            saved.remove(gone);
        }
        let patches = diff(&saved, &next);

        let mut deleted = Vec::new();
        if let Err(e) = self.commit_delete(&removed, &patches, &mut deleted) {
            tracing::warn!(menu = %self.menu_id, item = id, error = %e, "delete failed; restoring");
            self.restore_deleted(&deleted);
            self.reload()?;
            return Err(e.into());
        }

        if let Some(dir) = &self.recovery_dir {
            let records: Vec<MenuItem> = removed
                .iter()
                .filter_map(|gone| self.baseline.get(gone).cloned())
                .collect();
            recovery::log_deletion(dir, &self.menu_id, &records);
        }
        self.baseline = next.clone();
        self.menu = next;
        tracing::info!(menu = %self.menu_id, removed = removed.len(), %policy, "items deleted");
        Ok(DeleteReport {
            removed,
            saved: SaveReport { patches },
        })
    }

    fn commit_delete(
        &mut self,
        removed: &[String],
        patches: &[ItemPatch],
        deleted: &mut Vec<String>,
    ) -> Result<(), StoreError> {
        for gone in removed {
            self.store.delete(&self.menu_id, gone)?;
            deleted.push(gone.clone());
        }
        if !patches.is_empty() {
            self.store.bulk_upsert(&self.menu_id, patches)?;
        }
        Ok(())
    }

    /// Put back records a failed delete already removed.
    fn restore_deleted(&mut self, deleted: &[String]) {
        for gone in deleted {
            let Some(record) = self.baseline.get(gone) else {
                continue;
            };
            if let Err(e) = self.store.create(&self.menu_id, record) {
                tracing::warn!(menu = %self.menu_id, item = %gone, error = %e, "could not restore deleted item");
            }
        }
    }

    pub fn set_link(
        &mut self,
        id: &str,
        target: Option<LinkTarget>,
        resolver: &dyn LinkResolver,
    ) -> Result<(), EditorError> {
        self.write_through(id, |menu| {
            item_ops::set_link(menu, id, target, resolver)?;
            Ok(true)
        })?;
        Ok(())
    }

    /// Returns whether the flag changed.
    pub fn set_active(&mut self, id: &str, active: bool) -> Result<bool, EditorError> {
        self.write_through(id, |menu| item_ops::set_active(menu, id, active))
    }

    pub fn rename(&mut self, id: &str, title: String) -> Result<(), EditorError> {
        self.write_through(id, |menu| {
            item_ops::rename(menu, id, title)?;
            Ok(true)
        })?;
        Ok(())
    }

    /// Apply a payload edit, persist the record with its saved structure and
    /// mirror the edit into both the local menu and the baseline.
    fn write_through<F>(&mut self, id: &str, change: F) -> Result<bool, EditorError>
    where
        F: FnOnce(&mut Menu) -> Result<bool, ItemError>,
    {
        let mut scratch = self.menu.clone();
        if !change(&mut scratch)? {
            return Ok(false);
        }
        let edited = scratch
            .get(id)
            .ok_or_else(|| ItemError::NotFound(id.to_string()))?;
        let record = match self.baseline.get(id) {
            Some(saved) => MenuItem {
                is_active: edited.is_active,
                payload: edited.payload.clone(),
                ..saved.clone()
            },
            None => edited.clone(),
        };
        self.store.update(&self.menu_id, &record)?;

        for menu in [&mut self.menu, &mut self.baseline] {
            if let Some(item) = menu.get_mut(id) {
                item.is_active = record.is_active;
                item.payload = record.payload.clone();
            }
        }
        tracing::debug!(menu = %self.menu_id, item = id, "item updated");
        Ok(true)
    }
}
