use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::item::MenuItem;
use crate::model::menu::{Menu, TreeNode, sort_group};

/// One row of the fully expanded display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisualRow {
    pub id: String,
    pub depth: usize,
}

/// Build the nested forest from a flat menu.
///
/// Each sibling group is ordered by `sort_order` (id breaks ties). Records
/// whose parent does not resolve, or that name themselves as parent, become
/// roots. Records only reachable through a stored cycle are also surfaced as
/// roots: the cycle is cut at its lowest-ranked member, so nothing is dropped.
pub fn build_tree(menu: &Menu) -> Vec<TreeNode> {
    let mut index: HashMap<Option<&str>, Vec<&MenuItem>> = HashMap::new();
    for item in menu.items() {
        index
            .entry(menu.effective_parent(item))
            .or_default()
            .push(item);
    }
    for group in index.values_mut() {
        sort_group(group);
    }

    let mut visited: HashSet<&str> = HashSet::with_capacity(menu.len());
    let mut forest: Vec<TreeNode> = index
        .get(&None)
        .map(|roots| roots.clone())
        .unwrap_or_default()
        .into_iter()
        .map(|root| attach(root, &index, &mut visited))
        .collect();

    if visited.len() < menu.len() {
        let mut stranded: Vec<&MenuItem> = menu
            .items()
            .filter(|item| !visited.contains(item.id.as_str()))
            .collect();
        sort_group(&mut stranded);
        for item in stranded {
            if visited.contains(item.id.as_str()) {
                continue;
            }
            let cut = cycle_entry(menu, item);
            tracing::warn!(item = %cut.id, "menu contains a parent cycle; surfacing it as a root");
            forest.push(attach(cut, &index, &mut visited));
        }
    }

    forest
}

fn attach<'a>(
    item: &'a MenuItem,
    index: &HashMap<Option<&'a str>, Vec<&'a MenuItem>>,
    visited: &mut HashSet<&'a str>,
) -> TreeNode {
    visited.insert(item.id.as_str());
    let mut children = Vec::new();
    if let Some(group) = index.get(&Some(item.id.as_str())) {
        for child in group {
            if !visited.contains(child.id.as_str()) {
                children.push(attach(child, index, visited));
            }
        }
    }
    TreeNode {
        item: item.clone(),
        children,
    }
}

/// Walk up from a stranded record until the chain repeats, then pick the
/// lowest-ranked record on the loop.
fn cycle_entry<'a>(menu: &'a Menu, start: &'a MenuItem) -> &'a MenuItem {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut current = start;
    while seen.insert(current.id.as_str()) {
        match current.parent_id.as_deref().and_then(|pid| menu.get(pid)) {
            Some(parent) => current = parent,
            None => return start,
        }
    }

    let mut members = vec![current];
    let mut next = current.parent_id.as_deref().and_then(|pid| menu.get(pid));
    while let Some(item) = next {
        if item.id == current.id {
            break;
        }
        members.push(item);
        next = item.parent_id.as_deref().and_then(|pid| menu.get(pid));
    }
    sort_group(&mut members);
    members[0]
}

/// Depth-first pre-order walk back to flat records.
///
/// List order is display order; persistence never relies on it.
pub fn flatten(forest: &[TreeNode]) -> Vec<MenuItem> {
    let mut out = Vec::new();
    for node in forest {
        flatten_into(node, &mut out);
    }
    out
}

fn flatten_into(node: &TreeNode, out: &mut Vec<MenuItem>) {
    out.push(node.item.clone());
    for child in &node.children {
        flatten_into(child, out);
    }
}

/// The display order with every node expanded, paired with depth.
pub fn visual_order(forest: &[TreeNode]) -> Vec<VisualRow> {
    let mut rows = Vec::new();
    for node in forest {
        push_rows(node, 0, &mut rows);
    }
    rows
}

fn push_rows(node: &TreeNode, depth: usize, rows: &mut Vec<VisualRow>) {
    rows.push(VisualRow {
        id: node.item.id.clone(),
        depth,
    });
    for child in &node.children {
        push_rows(child, depth + 1, rows);
    }
}

/// The externally served view: inactive items are left out together with
/// everything beneath them.
pub fn active_forest(menu: &Menu) -> Vec<TreeNode> {
    let mut forest = build_tree(menu);
    prune_inactive(&mut forest);
    forest
}

fn prune_inactive(nodes: &mut Vec<TreeNode>) {
    nodes.retain(|node| node.item.is_active);
    for node in nodes.iter_mut() {
        prune_inactive(&mut node.children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(forest: &[TreeNode]) -> Vec<&str> {
        forest.iter().map(|n| n.id()).collect()
    }

    fn structural(items: &[MenuItem]) -> Vec<(String, Option<String>, u32)> {
        let mut out: Vec<_> = items
            .iter()
            .map(|i| (i.id.clone(), i.parent_id.clone(), i.sort_order))
            .collect();
        out.sort();
        out
    }

    fn nested() -> Menu {
        // Deliberately out of order on input
        Menu::from_items([
            MenuItem::new("c", "C").under(None, 2),
            MenuItem::new("b2", "B2").under(Some("b"), 1),
            MenuItem::new("a", "A").under(None, 0),
            MenuItem::new("b", "B").under(None, 1),
            MenuItem::new("b1", "B1").under(Some("b"), 0),
            MenuItem::new("b1a", "B1a").under(Some("b1"), 0),
        ])
    }

    #[test]
    fn build_groups_and_orders() {
        let forest = build_tree(&nested());
        assert_eq!(ids(&forest), vec!["a", "b", "c"]);
        let b = &forest[1];
        assert_eq!(ids(&b.children), vec!["b1", "b2"]);
        assert_eq!(ids(&b.children[0].children), vec!["b1a"]);
    }

    #[test]
    fn orphans_become_roots() {
        let menu = Menu::from_items([
            MenuItem::new("a", "A").under(None, 0),
            MenuItem::new("lost", "Lost").under(Some("deleted"), 0),
            MenuItem::new("me", "Me").under(Some("me"), 1),
        ]);
        let forest = build_tree(&menu);
        assert_eq!(ids(&forest), vec!["a", "lost", "me"]);
    }

    #[test]
    fn stored_cycle_is_surfaced_not_dropped() {
        let menu = Menu::from_items([
            MenuItem::new("root", "Root").under(None, 0),
            MenuItem::new("p", "P").under(Some("q"), 1),
            MenuItem::new("q", "Q").under(Some("p"), 0),
            MenuItem::new("leaf", "Leaf").under(Some("p"), 0),
        ]);
        let forest = build_tree(&menu);
        let total: usize = forest.iter().map(TreeNode::size).sum();
        assert_eq!(total, 4);
        // q has the lower rank on the loop, so the cut happens there
        assert_eq!(ids(&forest), vec!["root", "q"]);
        assert_eq!(ids(&forest[1].children), vec!["p"]);
    }

    #[test]
    fn flatten_is_preorder() {
        let flat = flatten(&build_tree(&nested()));
        let order: Vec<&str> = flat.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "b1", "b1a", "b2", "c"]);
    }

    #[test]
    fn round_trip_preserves_records() {
        let menu = nested();
        let original: Vec<MenuItem> = menu.items().cloned().collect();
        let flat = flatten(&build_tree(&menu));
        assert_eq!(structural(&flat), structural(&original));
    }

    #[test]
    fn visual_order_carries_depth() {
        let rows = visual_order(&build_tree(&nested()));
        let depths: Vec<(&str, usize)> = rows.iter().map(|r| (r.id.as_str(), r.depth)).collect();
        assert_eq!(
            depths,
            vec![("a", 0), ("b", 0), ("b1", 1), ("b1a", 2), ("b2", 1), ("c", 0)]
        );
    }

    #[test]
    fn active_forest_hides_inactive_subtrees() {
        let mut menu = nested();
        menu.get_mut("b1").unwrap().is_active = false;
        menu.get_mut("c").unwrap().is_active = false;
        let forest = active_forest(&menu);
        assert_eq!(ids(&forest), vec!["a", "b"]);
        assert_eq!(ids(&forest[1].children), vec!["b2"]);
    }

    #[test]
    fn empty_menu_builds_empty_forest() {
        assert!(build_tree(&Menu::new()).is_empty());
    }
}
