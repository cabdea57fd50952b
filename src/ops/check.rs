use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::model::config::RelocationConfig;
use crate::model::item::MenuItem;
use crate::model::menu::{Menu, TreeNode};
use crate::ops::tree::build_tree;

/// Structured result from `nt check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A broken structural invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// An item names itself as parent
    #[serde(rename = "self_parent")]
    SelfParent { item_id: String },
    /// `parent_id` references an item that does not exist
    #[serde(rename = "dangling_parent")]
    DanglingParent { item_id: String, parent_id: String },
    /// The parent chain loops; members listed in id order
    #[serde(rename = "cycle")]
    Cycle { item_ids: Vec<String> },
    /// A sibling group's ranks are not exactly `0..n-1`
    #[serde(rename = "non_contiguous_ranks")]
    NonContiguousRanks {
        parent_id: Option<String>,
        ranks: Vec<u32>,
    },
}

/// Something worth knowing that does not break the structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// Active item that the read view hides because an ancestor is inactive
    #[serde(rename = "hidden_by_inactive_ancestor")]
    HiddenByInactiveAncestor { item_id: String, ancestor_id: String },
    /// Item has no title
    #[serde(rename = "empty_title")]
    EmptyTitle { item_id: String },
    /// Stored nesting is deeper than the configured limit
    #[serde(rename = "too_deep")]
    TooDeep {
        item_id: String,
        depth: usize,
        max_depth: usize,
    },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a menu and return structured results.
///
/// Read-only. Checks performed:
/// 1. No self-parented items, no parent references to missing items
/// 2. No parent cycles
/// 3. Every sibling group ranked exactly `0..n-1`
/// 4. Warnings for hidden active items, empty titles, over-deep nesting
pub fn check_menu(menu: &Menu, rules: &RelocationConfig) -> CheckResult {
    let mut result = CheckResult::default();

    for item in menu.items() {
        match &item.parent_id {
            Some(pid) if pid == &item.id => result.errors.push(CheckError::SelfParent {
                item_id: item.id.clone(),
            }),
            Some(pid) if !menu.contains(pid) => result.errors.push(CheckError::DanglingParent {
                item_id: item.id.clone(),
                parent_id: pid.clone(),
            }),
            _ => {}
        }
    }

    for members in find_cycles(menu) {
        result.errors.push(CheckError::Cycle { item_ids: members });
    }

    check_ranks(menu, &mut result);
    check_items(menu, rules, &mut result);

    result.valid = result.errors.is_empty();
    result
}

/// Distinct parent loops, each as a sorted id list.
fn find_cycles(menu: &Menu) -> Vec<Vec<String>> {
    let mut loops: BTreeSet<Vec<String>> = BTreeSet::new();
    for item in menu.items() {
        if item.parent_id.as_deref() == Some(item.id.as_str()) {
            // reported as SelfParent
            continue;
        }
        if menu.ancestors(&item.id).is_ok() {
            continue;
        }
        let mut seen: Vec<&str> = Vec::new();
        let mut current = item;
        while !seen.contains(&current.id.as_str()) {
            seen.push(current.id.as_str());
            match current.parent_id.as_deref().and_then(|pid| menu.get(pid)) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        if let Some(start) = seen.iter().position(|id| *id == current.id) {
            let mut members: Vec<String> = seen[start..].iter().map(|s| s.to_string()).collect();
            members.sort();
            loops.insert(members);
        }
    }
    loops.into_iter().collect()
}

fn check_ranks(menu: &Menu, result: &mut CheckResult) {
    let mut groups: BTreeMap<Option<&str>, Vec<u32>> = BTreeMap::new();
    for item in menu.items() {
        groups
            .entry(item.parent_id.as_deref())
            .or_default()
            .push(item.sort_order);
    }
    for (parent, mut ranks) in groups {
        ranks.sort_unstable();
        let contiguous = ranks.iter().enumerate().all(|(i, r)| *r as usize == i);
        if !contiguous {
            result.errors.push(CheckError::NonContiguousRanks {
                parent_id: parent.map(str::to_string),
                ranks,
            });
        }
    }
}

fn check_items(menu: &Menu, rules: &RelocationConfig, result: &mut CheckResult) {
    for item in menu.items() {
        if item.title().trim().is_empty() {
            result.warnings.push(CheckWarning::EmptyTitle {
                item_id: item.id.clone(),
            });
        }

        let Ok(chain) = menu.ancestors(&item.id) else {
            continue;
        };
        if item.is_active
            && let Some(hidden_by) = chain
                .iter()
                .rev()
                .find(|id| menu.get(id).is_some_and(|a| !a.is_active))
        {
            result.warnings.push(CheckWarning::HiddenByInactiveAncestor {
                item_id: item.id.clone(),
                ancestor_id: hidden_by.to_string(),
            });
        }
        if let Some(max_depth) = rules.max_depth
            && chain.len() > max_depth
        {
            result.warnings.push(CheckWarning::TooDeep {
                item_id: item.id.clone(),
                depth: chain.len(),
                max_depth,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

/// Rewrite parents and ranks so the stored menu matches what is displayed.
///
/// Orphans and self-parented items become roots, each stored cycle is cut
/// at its lowest-ranked member, and every group is renumbered `0..n-1`.
/// Payloads are not touched.
pub fn repair(menu: &Menu) -> Menu {
    let forest = build_tree(menu);
    let mut out = Menu::new();
    let mut placed = HashSet::new();
    place(&forest, None, &mut out, &mut placed);
    out
}

fn place(nodes: &[TreeNode], parent_id: Option<&str>, out: &mut Menu, placed: &mut HashSet<String>) {
    for (rank, node) in nodes.iter().enumerate() {
        if !placed.insert(node.item.id.clone()) {
            continue;
        }
        let item = MenuItem {
            parent_id: parent_id.map(str::to_string),
            sort_order: rank as u32,
            ..node.item.clone()
        };
        out.insert(item);
        place(&node.children, Some(node.id()), out, placed);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
