use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io;
use crate::io::project_io::{self, CONFIG_FILE, NAVTREE_DIR};
use crate::io::store::validate_menu_id;
use crate::model::config::MenuConfig;

pub(crate) const NAVTREE_TOML_TEMPLATE: &str = r##"[project]
name = "{name}"

[relocation]
# Horizontal drag distance (pixels) that must be exceeded before a drop
# nests under the row above (positive) or promotes a level (negative).
drag_threshold = 35
# Deepest nesting allowed, roots are depth 0. Unset means unbounded.
# max_depth = 3

[delete]
# What happens to the children of a deleted item:
# "promote" (take its place), "cascade" (deleted too), "reject" (refuse)
policy = "promote"

# --- Menus ---
# One JSON file per menu lives in navtree/menus/<id>.json.
# Add menus with: nt menus add <id> "Name"

# --- Link routes ---
# Typed link targets resolve to these paths.
#
# [[links]]
# kind = "category"
# id = "shoes"
# path = "/c/shoes"
"##;

/// Infer a project name from a directory name: hyphens and underscores
/// become spaces, words are capitalized.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Pair up the flat `--menu ID NAME` values clap collects.
fn parse_menu_pairs(args: &[String]) -> Vec<MenuConfig> {
    args.chunks_exact(2)
        .map(|pair| MenuConfig {
            id: pair[0].clone(),
            name: pair[1].clone(),
        })
        .collect()
}

fn render_navtree_toml(name: &str, menus: &[MenuConfig]) -> Result<String, Box<dyn std::error::Error>> {
    let mut doc: toml_edit::DocumentMut = NAVTREE_TOML_TEMPLATE.parse()?;
    config_io::set_project_name(&mut doc, name);
    for menu in menus {
        config_io::add_menu_to_config(&mut doc, menu);
    }
    Ok(doc.to_string())
}

pub fn cmd_init(args: InitArgs, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let navtree_dir = root.join(NAVTREE_DIR);
    if navtree_dir.join(CONFIG_FILE).exists() && !args.force {
        return Err(format!(
            "navtree project already exists in {}",
            navtree_dir.display()
        )
        .into());
    }

    if let Some(parent) = root.parent()
        && let Ok(outer) = project_io::discover_project(parent)
    {
        eprintln!("note: enclosing project at {}", outer.display());
    }

    let mut menus = parse_menu_pairs(&args.menu);
    if menus.is_empty() {
        menus.push(MenuConfig {
            id: "main".into(),
            name: "Main".into(),
        });
    }
    let mut seen = std::collections::HashSet::new();
    for menu in &menus {
        validate_menu_id(&menu.id)?;
        if !seen.insert(menu.id.as_str()) {
            return Err(format!("duplicate menu id \"{}\"", menu.id).into());
        }
    }

    let name = args.name.unwrap_or_else(|| {
        root.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    fs::create_dir_all(navtree_dir.join("menus"))?;
    fs::write(
        navtree_dir.join(CONFIG_FILE),
        render_navtree_toml(&name, &menus)?,
    )?;

    println!("Initialized navtree project: {}", name);
    for menu in &menus {
        println!("  menu: {} ({})", menu.name, menu.id);
    }
    Ok(())
}
