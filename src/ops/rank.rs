use std::collections::HashSet;

use crate::model::item::ItemPatch;
use crate::model::menu::Menu;

/// Error type for rank reassignment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("parent not found: {0}")]
    ParentNotFound(String),
    #[error("cannot place {0} under itself or one of its descendants")]
    WouldCycle(String),
}

/// Move one item to `new_index` within the group of `new_parent_id` and
/// recompact ranks.
///
/// Only two sibling groups are rewritten: the one the item leaves (closed up
/// to `0..n-1`) and the one it joins (opened at `new_index`, clamped to the
/// group size). Every other record is returned as it came in.
pub fn reassign(
    menu: &Menu,
    moved_id: &str,
    new_parent_id: Option<&str>,
    new_index: usize,
) -> Result<Menu, RankError> {
    let moved = menu
        .get(moved_id)
        .ok_or_else(|| RankError::NotFound(moved_id.to_string()))?;

    if let Some(pid) = new_parent_id {
        if !menu.contains(pid) {
            return Err(RankError::ParentNotFound(pid.to_string()));
        }
        if pid == moved_id {
            return Err(RankError::WouldCycle(moved_id.to_string()));
        }
        // A stored cycle above the new parent fails safe
        let reaches_moved = menu
            .ancestors(pid)
            .map_or(true, |chain| chain.contains(&moved_id));
        if reaches_moved {
            return Err(RankError::WouldCycle(moved_id.to_string()));
        }
    }

    let old_parent_id = moved.parent_id.clone();
    let mut out = menu.clone();

    let mut old_group = out.sibling_ids(old_parent_id.as_deref());
    old_group.retain(|id| id != moved_id);

    let same_group = old_parent_id.as_deref() == new_parent_id;
    if !same_group {
        assign_ranks(&mut out, &old_group);
    }

    let mut new_group = if same_group {
        old_group
    } else {
        out.sibling_ids(new_parent_id)
    };
    let at = new_index.min(new_group.len());
    new_group.insert(at, moved_id.to_string());

    if let Some(item) = out.get_mut(moved_id) {
        item.parent_id = new_parent_id.map(str::to_string);
    }
    assign_ranks(&mut out, &new_group);

    Ok(out)
}

/// Give the listed ids ranks `0..n-1` in list order.
pub fn assign_ranks(menu: &mut Menu, ordered_ids: &[String]) {
    for (rank, id) in ordered_ids.iter().enumerate() {
        if let Some(item) = menu.get_mut(id) {
            item.sort_order = rank as u32;
        }
    }
}

/// Recompact one sibling group, keeping its current relative order.
pub fn compact_group(menu: &mut Menu, parent_id: Option<&str>) {
    let ids = menu.sibling_ids(parent_id);
    assign_ranks(menu, &ids);
}

/// Recompact every sibling group.
pub fn compact_all(menu: &mut Menu) {
    let parents: HashSet<Option<String>> = menu.items().map(|i| i.parent_id.clone()).collect();
    for parent in parents {
        compact_group(menu, parent.as_deref());
    }
}

/// The structural changes needed to turn `before` into `after`.
///
/// One patch per record present in both whose parent or rank differs; records
/// new in `after` are patched in full. The parent is left out of a patch when
/// it did not change. Records missing from `after` produce nothing.
pub fn diff(before: &Menu, after: &Menu) -> Vec<ItemPatch> {
    let mut patches = Vec::new();
    for item in after.items() {
        match before.get(&item.id) {
            Some(old) => {
                let parent_changed = old.parent_id != item.parent_id;
                if parent_changed || old.sort_order != item.sort_order {
                    patches.push(ItemPatch {
                        id: item.id.clone(),
                        parent_id: parent_changed.then(|| item.parent_id.clone()),
                        sort_order: item.sort_order,
                    });
                }
            }
            None => patches.push(ItemPatch {
                id: item.id.clone(),
                parent_id: Some(item.parent_id.clone()),
                sort_order: item.sort_order,
            }),
        }
    }
    patches
}

/// Apply patches to a menu, skipping ids it does not hold.
pub fn apply_patches(menu: &mut Menu, patches: &[ItemPatch]) {
    for patch in patches {
        if let Some(item) = menu.get_mut(&patch.id) {
            patch.apply_to(item);
        }
    }
}
