use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use super::item::MenuItem;

/// The parent chain of an item looped back on itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleDetected;

/// The owned flat list of a menu, keyed by item id.
///
/// This is the state value every engine operation takes and returns. Record
/// order is insertion order and carries no meaning; ranks live in `sort_order`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    items: IndexMap<String, MenuItem>,
}

impl Menu {
    pub fn new() -> Self {
        Menu::default()
    }

    /// Build from records as loaded from a store. A repeated id replaces the
    /// earlier record.
    pub fn from_items(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let mut menu = Menu::new();
        for item in items {
            menu.insert(item);
        }
        menu
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&MenuItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut MenuItem> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &MenuItem> {
        self.items.values()
    }

    pub fn into_items(self) -> Vec<MenuItem> {
        self.items.into_values().collect()
    }

    pub fn insert(&mut self, item: MenuItem) -> Option<MenuItem> {
        self.items.insert(item.id.clone(), item)
    }

    /// Remove a record, keeping the relative order of the rest
    pub fn remove(&mut self, id: &str) -> Option<MenuItem> {
        self.items.shift_remove(id)
    }

    /// Whether `parent_id` points at a record that exists (roots count as valid).
    pub fn parent_resolves(&self, item: &MenuItem) -> bool {
        match &item.parent_id {
            None => true,
            Some(pid) => pid != &item.id && self.items.contains_key(pid),
        }
    }

    /// The parent an item is effectively attached to: orphans and
    /// self-parented records behave as roots.
    pub fn effective_parent<'a>(&self, item: &'a MenuItem) -> Option<&'a str> {
        if self.parent_resolves(item) {
            item.parent_id.as_deref()
        } else {
            None
        }
    }

    /// Members of a sibling group ordered by `(sort_order, id)`.
    pub fn siblings(&self, parent_id: Option<&str>) -> Vec<&MenuItem> {
        let mut group: Vec<&MenuItem> = self
            .items
            .values()
            .filter(|item| item.parent_id.as_deref() == parent_id)
            .collect();
        sort_group(&mut group);
        group
    }

    /// Ids of a sibling group in rank order.
    pub fn sibling_ids(&self, parent_id: Option<&str>) -> Vec<String> {
        self.siblings(parent_id)
            .into_iter()
            .map(|item| item.id.clone())
            .collect()
    }

    /// Position of an item within its own sibling group.
    pub fn sibling_index(&self, id: &str) -> Option<usize> {
        let item = self.items.get(id)?;
        self.siblings(item.parent_id.as_deref())
            .iter()
            .position(|s| s.id == id)
    }

    /// Parent → children index over the whole menu, each group rank-ordered.
    /// Keyed by the stored `parent_id`.
    pub fn children_index(&self) -> HashMap<Option<&str>, Vec<&MenuItem>> {
        let mut index: HashMap<Option<&str>, Vec<&MenuItem>> = HashMap::new();
        for item in self.items.values() {
            index
                .entry(item.parent_id.as_deref())
                .or_default()
                .push(item);
        }
        for group in index.values_mut() {
            sort_group(group);
        }
        index
    }

    /// Ids from the item's parent up to its root, nearest first.
    ///
    /// The walk stops at a root or at a parent reference that does not
    /// resolve. It never takes more steps than there are records; a chain that
    /// revisits an id reports `CycleDetected` instead of looping.
    pub fn ancestors(&self, id: &str) -> Result<Vec<&str>, CycleDetected> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let Some(start) = self.items.get(id) else {
            return Ok(chain);
        };
        seen.insert(start.id.as_str());
        let mut next = start.parent_id.as_deref();
        while let Some(pid) = next {
            let Some(parent) = self.items.get(pid) else {
                break;
            };
            if !seen.insert(parent.id.as_str()) || chain.len() >= self.items.len() {
                return Err(CycleDetected);
            }
            chain.push(parent.id.as_str());
            next = parent.parent_id.as_deref();
        }
        Ok(chain)
    }

    /// Number of ancestors; `None` when the chain is cyclic.
    pub fn depth(&self, id: &str) -> Option<usize> {
        self.ancestors(id).ok().map(|chain| chain.len())
    }

    /// Every id below `id`, in no particular order.
    pub fn descendants(&self, id: &str) -> HashSet<String> {
        let index = self.children_index();
        let mut found = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(children) = index.get(&Some(current)) {
                for child in children {
                    if child.id != id && found.insert(child.id.clone()) {
                        stack.push(child.id.as_str());
                    }
                }
            }
        }
        found
    }

    /// Levels below `id`: 0 for a leaf, 1 when it only has children, and so on.
    pub fn subtree_height(&self, id: &str) -> usize {
        let index = self.children_index();
        let mut visited = HashSet::new();
        height_of(&index, id, &mut visited)
    }
}

fn height_of<'a>(
    index: &HashMap<Option<&'a str>, Vec<&'a MenuItem>>,
    id: &'a str,
    visited: &mut HashSet<&'a str>,
) -> usize {
    if !visited.insert(id) {
        return 0;
    }
    index
        .get(&Some(id))
        .map(|children| {
            children
                .iter()
                .map(|child| 1 + height_of(index, child.id.as_str(), visited))
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0)
}

/// Rank order inside a sibling group; id breaks ties on corrupt data.
pub(crate) fn sort_group(group: &mut [&MenuItem]) {
    group.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
}

/// A menu item with its children materialised in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub item: MenuItem,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn id(&self) -> &str {
        &self.item.id
    }

    /// Count of this node plus everything below it
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    /// Pre-order search of this subtree
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.item.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}
