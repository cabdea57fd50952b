use std::path::PathBuf;

use super::config::{MenuConfig, ProjectConfig};

/// A navtree project located on disk
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of `navtree/`)
    pub root: PathBuf,
    /// Path to the `navtree/` directory; also where the lock and recovery log live
    pub navtree_dir: PathBuf,
    /// Parsed navtree.toml
    pub config: ProjectConfig,
}

impl Project {
    pub fn menu_config(&self, menu_id: &str) -> Option<&MenuConfig> {
        self.config.menus.iter().find(|m| m.id == menu_id)
    }

    /// The menu used when a command does not name one
    pub fn default_menu(&self) -> Option<&str> {
        self.config.menus.first().map(|m| m.id.as_str())
    }
}
