use crate::io::links::{LinkError, LinkResolver};
use crate::model::config::DeletePolicy;
use crate::model::item::{ItemPayload, LinkTarget, MenuItem};
use crate::model::menu::Menu;
use crate::ops::rank::{assign_ranks, compact_group};

/// Error type for item lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("parent not found: {0}")]
    ParentNotFound(String),
    #[error("item id already in use: {0}")]
    DuplicateId(String),
    #[error("{id} has {count} children; delete policy is reject")]
    HasChildren { id: String, count: usize },
    #[error("could not resolve link: {0}")]
    Link(#[from] LinkError),
}

/// Fields for a new item; structure is assigned by `add_item`.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub payload: ItemPayload,
    pub is_active: bool,
}

impl NewItem {
    pub fn titled(title: impl Into<String>) -> Self {
        NewItem {
            payload: ItemPayload {
                title: title.into(),
                ..Default::default()
            },
            is_active: true,
            ..Default::default()
        }
    }
}

/// Append a new item to its sibling group (rank = current sibling count).
/// Returns the created record.
pub fn add_item(menu: &mut Menu, new: NewItem, id_prefix: &str) -> Result<MenuItem, ItemError> {
    if let Some(pid) = &new.parent_id
        && !menu.contains(pid)
    {
        return Err(ItemError::ParentNotFound(pid.clone()));
    }
    let id = match new.id {
        Some(id) if menu.contains(&id) => return Err(ItemError::DuplicateId(id)),
        Some(id) => id,
        None => next_item_id(menu, id_prefix),
    };
    let sort_order = menu.siblings(new.parent_id.as_deref()).len() as u32;
    let item = MenuItem {
        id,
        parent_id: new.parent_id,
        sort_order,
        is_active: new.is_active,
        payload: new.payload,
    };
    menu.insert(item.clone());
    Ok(item)
}

/// Remove an item. Returns the ids that left the menu.
///
/// Later siblings shift down one rank. Children follow `policy`: promoted
/// into the deleted item's slot (in their own order), deleted with it, or the
/// deletion is refused.
pub fn delete_item(menu: &mut Menu, id: &str, policy: DeletePolicy) -> Result<Vec<String>, ItemError> {
    let item = menu
        .get(id)
        .ok_or_else(|| ItemError::NotFound(id.to_string()))?;
    let parent_id = item.parent_id.clone();
    let children = menu.sibling_ids(Some(id));

    let removed = match policy {
        DeletePolicy::Reject if !children.is_empty() => {
            return Err(ItemError::HasChildren {
                id: id.to_string(),
                count: children.len(),
            });
        }
        DeletePolicy::Cascade => {
            let mut removed = vec![id.to_string()];
            let mut below: Vec<String> = menu.descendants(id).into_iter().collect();
            below.sort();
            removed.extend(below);
            removed
        }
        DeletePolicy::Promote | DeletePolicy::Reject => {
            let mut group = menu.sibling_ids(parent_id.as_deref());
            let at = group.iter().position(|s| s == id).unwrap_or(group.len());
            group.remove(at);
            for (offset, child) in children.iter().enumerate() {
                group.insert(at + offset, child.clone());
                if let Some(c) = menu.get_mut(child) {
                    c.parent_id = parent_id.clone();
                }
            }
            assign_ranks(menu, &group);
            vec![id.to_string()]
        }
    };

    for gone in &removed {
        menu.remove(gone);
    }
    compact_group(menu, parent_id.as_deref());
    Ok(removed)
}

/// Point an item at a new link target (or clear it), storing the resolved path.
pub fn set_link(
    menu: &mut Menu,
    id: &str,
    target: Option<LinkTarget>,
    resolver: &dyn LinkResolver,
) -> Result<(), ItemError> {
    let url = target.as_ref().map(|t| resolver.resolve(t)).transpose()?;
    let item = menu
        .get_mut(id)
        .ok_or_else(|| ItemError::NotFound(id.to_string()))?;
    item.payload.link = target;
    item.payload.url = url;
    Ok(())
}

/// Toggle visibility in the read view. Returns whether anything changed.
pub fn set_active(menu: &mut Menu, id: &str, active: bool) -> Result<bool, ItemError> {
    let item = menu
        .get_mut(id)
        .ok_or_else(|| ItemError::NotFound(id.to_string()))?;
    if item.is_active == active {
        return Ok(false);
    }
    item.is_active = active;
    Ok(true)
}

pub fn rename(menu: &mut Menu, id: &str, title: String) -> Result<(), ItemError> {
    let item = menu
        .get_mut(id)
        .ok_or_else(|| ItemError::NotFound(id.to_string()))?;
    item.payload.title = title;
    Ok(())
}

/// Next free id of the form `<prefix>-NNN`.
pub fn next_item_id(menu: &Menu, prefix: &str) -> String {
    let prefix_dash = format!("{}-", prefix);
    let max = menu
        .items()
        .filter_map(|item| item.id.strip_prefix(&prefix_dash))
        .filter_map(|num| num.parse::<usize>().ok())
        .max()
        .unwrap_or(0);
    format!("{}-{:03}", prefix, max + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
