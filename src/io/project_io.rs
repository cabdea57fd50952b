use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::ProjectConfig;
use crate::model::project::Project;

pub const NAVTREE_DIR: &str = "navtree";
pub const CONFIG_FILE: &str = "navtree.toml";

/// Error type for project I/O operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("not a navtree project: no navtree/navtree.toml found")]
    NotAProject,
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse navtree.toml: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("could not edit navtree.toml: {0}")]
    ConfigEdit(#[from] toml_edit::TomlError),
}

/// Walk up from `start` to the first directory containing
/// `navtree/navtree.toml`.
pub fn discover_project(start: &Path) -> Result<PathBuf, ProjectError> {
    start
        .ancestors()
        .find(|dir| dir.join(NAVTREE_DIR).join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or(ProjectError::NotAProject)
}

/// Load the project rooted at `root`.
pub fn load_project(root: &Path) -> Result<Project, ProjectError> {
    let navtree_dir = root.join(NAVTREE_DIR);
    if !navtree_dir.is_dir() {
        return Err(ProjectError::NotAProject);
    }
    let config_path = navtree_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&config_path).map_err(|source| ProjectError::Read {
        path: config_path,
        source,
    })?;
    let config: ProjectConfig = toml::from_str(&text)?;
    tracing::debug!(
        root = %root.display(),
        menus = config.menus.len(),
        "project loaded"
    );
    Ok(Project {
        root: root.to_path_buf(),
        navtree_dir,
        config,
    })
}
