use std::fs;
use std::path::Path;

use crate::io::project_io::{CONFIG_FILE, ProjectError};
use crate::io::recovery::atomic_write;
use crate::model::config::{MenuConfig, ProjectConfig};

/// Read navtree.toml as both a typed config and an editable document.
pub fn read_config(navtree_dir: &Path) -> Result<(ProjectConfig, toml_edit::DocumentMut), ProjectError> {
    let path = navtree_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|source| ProjectError::Read { path, source })?;
    let config: ProjectConfig = toml::from_str(&text)?;
    let doc = text.parse::<toml_edit::DocumentMut>()?;
    Ok((config, doc))
}

/// Write the document back, keeping the user's comments and layout.
pub fn write_config(navtree_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ProjectError> {
    let path = navtree_dir.join(CONFIG_FILE);
    atomic_write(&path, doc.to_string().as_bytes())
        .map_err(|source| ProjectError::Write { path, source })
}

/// Append a `[[menus]]` entry
pub fn add_menu_to_config(doc: &mut toml_edit::DocumentMut, menu: &MenuConfig) {
    if !doc.contains_key("menus") {
        doc["menus"] = toml_edit::Item::ArrayOfTables(toml_edit::ArrayOfTables::new());
    }
    if let Some(menus) = doc["menus"].as_array_of_tables_mut() {
        let mut table = toml_edit::Table::new();
        table["id"] = toml_edit::value(&menu.id);
        table["name"] = toml_edit::value(&menu.name);
        menus.push(table);
    }
}

/// Set `[project] name`
pub fn set_project_name(doc: &mut toml_edit::DocumentMut, name: &str) {
    if !doc.contains_key("project") {
        doc["project"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc["project"]["name"] = toml_edit::value(name);
}
