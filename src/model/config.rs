use serde::{Deserialize, Serialize};

/// Configuration from navtree.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectInfo,
    #[serde(default)]
    pub relocation: RelocationConfig,
    #[serde(default)]
    pub delete: DeleteConfig,
    #[serde(default)]
    pub menus: Vec<MenuConfig>,
    #[serde(default)]
    pub links: Vec<LinkRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    pub id: String,
    pub name: String,
}

/// Tuning for the relocation resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationConfig {
    /// Half-width of the neutral band for horizontal drag displacement.
    /// Default: see NAVTREE_TOML_TEMPLATE in cli/handlers/init.rs
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold: i32,
    /// Deepest allowed depth (roots are depth 0). Absent = unbounded.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl Default for RelocationConfig {
    fn default() -> Self {
        RelocationConfig {
            drag_threshold: default_drag_threshold(),
            max_depth: None,
        }
    }
}

/// Default: see NAVTREE_TOML_TEMPLATE in cli/handlers/init.rs
fn default_drag_threshold() -> i32 {
    35
}

/// What happens to the children of a deleted item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Children take the deleted item's place in its parent group
    #[default]
    Promote,
    /// The whole subtree is deleted
    Cascade,
    /// Deleting an item that has children is refused
    Reject,
}

impl std::fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletePolicy::Promote => write!(f, "promote"),
            DeletePolicy::Cascade => write!(f, "cascade"),
            DeletePolicy::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeleteConfig {
    #[serde(default)]
    pub policy: DeletePolicy,
}

/// A configured destination for one typed link target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRoute {
    pub kind: String,
    pub id: String,
    pub path: String,
}
