use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::config::RelocationConfig;
use crate::model::menu::{Menu, TreeNode};
use crate::ops::rank::{self, RankError};
use crate::ops::tree::{build_tree, visual_order};

/// Error type for relocation requests that cannot even be evaluated.
///
/// A move that is understood but not allowed is a `Rejection`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelocateError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("drop slot {slot} is out of range (menu shows {len} rows)")]
    SlotOutOfRange { slot: usize, len: usize },
    #[error(transparent)]
    Rank(#[from] RankError),
}

/// A drag-and-drop of one item onto a row of the display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragMove {
    pub item_id: String,
    /// Row index in the display order with the dragged subtree collapsed
    /// into its root. The row there is the anchor.
    pub target_slot: usize,
    /// Horizontal displacement; positive is inward (deeper).
    pub horizontal_delta: i32,
}

/// Everything the presentation layer can ask the resolver to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum Gesture {
    Drag(DragMove),
    Indent { item_id: String },
    Outdent { item_id: String },
}

impl Gesture {
    pub fn item_id(&self) -> &str {
        match self {
            Gesture::Drag(drag) => &drag.item_id,
            Gesture::Indent { item_id } | Gesture::Outdent { item_id } => item_id,
        }
    }
}

/// Why a gesture left the menu as it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The new parent is the item itself or lies beneath it
    Cycle,
    /// Indent of an item that is first in its group
    NoPrecedingSibling,
    /// Outdent of a root
    AlreadyRoot,
    /// The subtree would sink below the configured depth limit
    MaxDepth,
    /// The gesture resolves to the item's current place
    Unchanged,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Cycle => write!(f, "would nest the item under itself"),
            Rejection::NoPrecedingSibling => write!(f, "no preceding sibling to indent under"),
            Rejection::AlreadyRoot => write!(f, "already at the top level"),
            Rejection::MaxDepth => write!(f, "maximum nesting depth reached"),
            Rejection::Unchanged => write!(f, "item is already there"),
        }
    }
}

/// Where the resolver decided an item goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub item_id: String,
    pub parent_id: Option<String>,
    /// Position among the new siblings, not counting the item itself
    pub index: usize,
}

/// Result of a relocation: a new menu, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    Applied { menu: Menu, placement: Placement },
    Rejected(Rejection),
}

/// Resolve a gesture and reassign ranks. The input menu is never modified;
/// on rejection the caller keeps using it as is.
pub fn relocate(
    menu: &Menu,
    gesture: &Gesture,
    rules: &RelocationConfig,
) -> Result<Relocation, RelocateError> {
    let placement = match resolve(menu, gesture, rules)? {
        Ok(placement) => placement,
        Err(rejection) => {
            tracing::debug!(item = gesture.item_id(), %rejection, "relocation rejected");
            return Ok(Relocation::Rejected(rejection));
        }
    };
    apply(menu, placement)
}

/// Put an item at an explicit parent and index, under the same guards as a
/// gesture. The index is clamped to the size of the new group.
pub fn place(
    menu: &Menu,
    item_id: &str,
    parent_id: Option<&str>,
    index: usize,
    rules: &RelocationConfig,
) -> Result<Relocation, RelocateError> {
    if !menu.contains(item_id) {
        return Err(RelocateError::NotFound(item_id.to_string()));
    }
    if let Some(pid) = parent_id {
        if !menu.contains(pid) {
            return Err(RankError::ParentNotFound(pid.to_string()).into());
        }
        if would_cycle(menu, item_id, &menu.descendants(item_id), pid) {
            return Ok(Relocation::Rejected(Rejection::Cycle));
        }
    }
    if exceeds_depth(menu, item_id, parent_id, rules) {
        return Ok(Relocation::Rejected(Rejection::MaxDepth));
    }
    let others = menu
        .siblings(parent_id)
        .iter()
        .filter(|item| item.id != item_id)
        .count();
    match unless_unchanged(menu, item_id, parent_id.map(str::to_string), index.min(others)) {
        Ok(placement) => apply(menu, placement),
        Err(rejection) => Ok(Relocation::Rejected(rejection)),
    }
}

fn apply(menu: &Menu, placement: Placement) -> Result<Relocation, RelocateError> {
    let next = rank::reassign(
        menu,
        &placement.item_id,
        placement.parent_id.as_deref(),
        placement.index,
    )?;
    tracing::debug!(
        item = %placement.item_id,
        parent = ?placement.parent_id,
        index = placement.index,
        "relocation applied"
    );
    Ok(Relocation::Applied {
        menu: next,
        placement,
    })
}

/// Decide the new parent and sibling position for a gesture.
pub fn resolve(
    menu: &Menu,
    gesture: &Gesture,
    rules: &RelocationConfig,
) -> Result<Result<Placement, Rejection>, RelocateError> {
    let item_id = gesture.item_id();
    if !menu.contains(item_id) {
        return Err(RelocateError::NotFound(item_id.to_string()));
    }
    match gesture {
        Gesture::Drag(drag) => resolve_drag(menu, drag, rules),
        Gesture::Indent { item_id } => resolve_indent(menu, item_id, rules),
        Gesture::Outdent { item_id } => resolve_outdent(menu, item_id),
    }
}

// ---------------------------------------------------------------------------
// Drag
// ---------------------------------------------------------------------------

fn resolve_drag(
    menu: &Menu,
    drag: &DragMove,
    rules: &RelocationConfig,
) -> Result<Result<Placement, Rejection>, RelocateError> {
    let moved_id = drag.item_id.as_str();
    let forest = build_tree(menu);
    let subtree = subtree_ids(&forest, moved_id);

    // The dragged subtree collapses into its root
    let rows: Vec<String> = visual_order(&forest)
        .into_iter()
        .map(|row| row.id)
        .filter(|id| id == moved_id || !subtree.contains(id))
        .collect();
    let slot = drag.target_slot;
    if slot >= rows.len() {
        return Err(RelocateError::SlotOutOfRange {
            slot,
            len: rows.len(),
        });
    }
    let from = rows
        .iter()
        .position(|id| id == moved_id)
        .ok_or_else(|| RelocateError::NotFound(moved_id.to_string()))?;
    let anchor_id = rows[slot].clone();

    let mut tentative = rows;
    let moved = tentative.remove(from);
    tentative.insert(slot, moved);
    let predecessor = slot.checked_sub(1).map(|i| tentative[i].as_str());

    let threshold = rules.drag_threshold.abs();
    let current_parent = effective_parent_id(menu, moved_id);
    let new_parent = if drag.horizontal_delta > threshold && predecessor.is_some() {
        predecessor.map(str::to_string)
    } else if drag.horizontal_delta < -threshold {
        current_parent.and_then(|pid| effective_parent_id(menu, &pid))
    } else if anchor_id == moved_id {
        current_parent
    } else {
        effective_parent_id(menu, &anchor_id)
    };

    if let Some(pid) = new_parent.as_deref()
        && would_cycle(menu, moved_id, &subtree, pid)
    {
        return Ok(Err(Rejection::Cycle));
    }
    if exceeds_depth(menu, moved_id, new_parent.as_deref(), rules) {
        return Ok(Err(Rejection::MaxDepth));
    }

    let index = tentative[..slot]
        .iter()
        .filter(|id| {
            menu.get(id.as_str())
                .is_some_and(|item| item.parent_id == new_parent)
        })
        .count();

    Ok(unless_unchanged(menu, moved_id, new_parent, index))
}

// ---------------------------------------------------------------------------
// Indent / outdent
// ---------------------------------------------------------------------------

/// Nest under the sibling directly above, as its last child.
fn resolve_indent(
    menu: &Menu,
    item_id: &str,
    rules: &RelocationConfig,
) -> Result<Result<Placement, Rejection>, RelocateError> {
    let not_found = || RelocateError::NotFound(item_id.to_string());
    let item = menu.get(item_id).ok_or_else(not_found)?;
    let siblings = menu.sibling_ids(item.parent_id.as_deref());
    let position = siblings
        .iter()
        .position(|id| id == item_id)
        .ok_or_else(not_found)?;
    if position == 0 {
        return Ok(Err(Rejection::NoPrecedingSibling));
    }
    let new_parent = siblings[position - 1].clone();

    let subtree = menu.descendants(item_id);
    if would_cycle(menu, item_id, &subtree, &new_parent) {
        return Ok(Err(Rejection::Cycle));
    }
    if exceeds_depth(menu, item_id, Some(&new_parent), rules) {
        return Ok(Err(Rejection::MaxDepth));
    }

    let index = menu.siblings(Some(&new_parent)).len();
    Ok(Ok(Placement {
        item_id: item_id.to_string(),
        parent_id: Some(new_parent),
        index,
    }))
}

/// Promote to the grandparent, directly after the former parent.
fn resolve_outdent(menu: &Menu, item_id: &str) -> Result<Result<Placement, Rejection>, RelocateError> {
    if !menu.contains(item_id) {
        return Err(RelocateError::NotFound(item_id.to_string()));
    }
    let Some(parent_id) = effective_parent_id(menu, item_id) else {
        return Ok(Err(Rejection::AlreadyRoot));
    };
    if menu.ancestors(&parent_id).is_err() {
        return Ok(Err(Rejection::Cycle));
    }
    let grandparent = effective_parent_id(menu, &parent_id);
    let index = menu
        .sibling_ids(grandparent.as_deref())
        .iter()
        .position(|id| *id == parent_id)
        .map_or(0, |i| i + 1);
    Ok(Ok(Placement {
        item_id: item_id.to_string(),
        parent_id: grandparent,
        index,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn effective_parent_id(menu: &Menu, id: &str) -> Option<String> {
    let item = menu.get(id)?;
    menu.effective_parent(item).map(str::to_string)
}

/// Ids strictly below `id` in the displayed forest.
fn subtree_ids(forest: &[TreeNode], id: &str) -> HashSet<String> {
    let mut ids = HashSet::new();
    if let Some(node) = forest.iter().find_map(|root| root.find(id)) {
        collect_ids(&node.children, &mut ids);
    }
    ids
}

fn collect_ids(nodes: &[TreeNode], ids: &mut HashSet<String>) {
    for node in nodes {
        ids.insert(node.item.id.clone());
        collect_ids(&node.children, ids);
    }
}

/// Whether making `candidate` the parent of `moved_id` closes a loop.
///
/// Walks the candidate's ancestor chain; a stored cycle on that chain counts
/// as reaching the moved item.
fn would_cycle(menu: &Menu, moved_id: &str, subtree: &HashSet<String>, candidate: &str) -> bool {
    if candidate == moved_id || subtree.contains(candidate) {
        return true;
    }
    match menu.ancestors(candidate) {
        Ok(chain) => chain
            .iter()
            .any(|id| *id == moved_id || subtree.contains(*id)),
        Err(_) => true,
    }
}

fn exceeds_depth(
    menu: &Menu,
    moved_id: &str,
    new_parent: Option<&str>,
    rules: &RelocationConfig,
) -> bool {
    let Some(max_depth) = rules.max_depth else {
        return false;
    };
    let new_depth = match new_parent {
        None => 0,
        Some(pid) => match menu.depth(pid) {
            Some(depth) => depth + 1,
            None => return true,
        },
    };
    new_depth + menu.subtree_height(moved_id) > max_depth
}

fn unless_unchanged(
    menu: &Menu,
    moved_id: &str,
    new_parent: Option<String>,
    index: usize,
) -> Result<Placement, Rejection> {
    let same_parent = menu
        .get(moved_id)
        .is_some_and(|item| item.parent_id == new_parent);
    if same_parent && menu.sibling_index(moved_id) == Some(index) {
        return Err(Rejection::Unchanged);
    }
    Ok(Placement {
        item_id: moved_id.to_string(),
        parent_id: new_parent,
        index,
    })
}
