use serde::Serialize;

use crate::editor::{RelocateOutcome, SaveReport};
use crate::model::item::{ItemPatch, LinkTarget};
use crate::model::menu::TreeNode;
use crate::ops::check::{CheckError, CheckResult, CheckWarning};
use crate::util::unicode::{pad_to_width, truncate_to_width};

/// Title column width for `nt tree`
pub const TITLE_WIDTH: usize = 40;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct MenuInfoJson {
    pub id: String,
    pub name: String,
    pub items: usize,
}

#[derive(Serialize)]
pub struct TreeJson<'a> {
    pub menu: &'a str,
    pub items: &'a [TreeNode],
}

#[derive(Serialize)]
pub struct GestureJson<'a> {
    #[serde(flatten)]
    pub outcome: &'a RelocateOutcome,
    pub saved: &'a [ItemPatch],
}

#[derive(Serialize)]
pub struct RemovedJson<'a> {
    pub removed: &'a [String],
    pub saved: &'a [ItemPatch],
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// One line per item, children indented two spaces under their parent:
/// title column, id, then ` (hidden)` for inactive items and ` -> url`.
pub fn format_tree(forest: &[TreeNode], title_width: usize, show_rows: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for node in forest {
        push_tree_lines(node, 0, title_width, show_rows, &mut lines);
    }
    lines
}

fn push_tree_lines(
    node: &TreeNode,
    depth: usize,
    title_width: usize,
    show_rows: bool,
    lines: &mut Vec<String>,
) {
    let label = format!("{}{}", "  ".repeat(depth), node.item.title());
    let mut line = String::new();
    if show_rows {
        line.push_str(&format!("{:>3}  ", lines.len()));
    }
    line.push_str(&pad_to_width(&truncate_to_width(&label, title_width), title_width));
    line.push_str("  ");
    line.push_str(node.id());
    if !node.item.is_active {
        line.push_str(" (hidden)");
    }
    if let Some(url) = &node.item.payload.url {
        line.push_str(" -> ");
        line.push_str(url);
    }
    lines.push(line);
    for child in &node.children {
        push_tree_lines(child, depth + 1, title_width, show_rows, lines);
    }
}

pub fn format_outcome(outcome: &RelocateOutcome, item_id: &str) -> String {
    match (&outcome.placement, &outcome.rejection) {
        (Some(placement), _) => format!(
            "{} -> {} at {}",
            placement.item_id,
            placement.parent_id.as_deref().unwrap_or("(top level)"),
            placement.index
        ),
        (None, Some(rejection)) => format!("{} not moved: {}", item_id, rejection),
        (None, None) => format!("{} not moved", item_id),
    }
}

pub fn format_save(report: &SaveReport) -> Option<String> {
    if report.is_empty() {
        None
    } else {
        Some(format!("saved {} record(s)", report.patches.len()))
    }
}

pub fn format_check(result: &CheckResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(format!("  {}", describe_error(err)));
        }
    }
    if !result.warnings.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Warnings:".to_string());
        for warning in &result.warnings {
            lines.push(format!("  {}", describe_warning(warning)));
        }
    }
    lines.push(if result.valid {
        "✓ menu is valid".to_string()
    } else {
        "✗ menu has errors (run `nt repair`)".to_string()
    });
    lines
}

fn describe_error(err: &CheckError) -> String {
    match err {
        CheckError::SelfParent { item_id } => format!("{} is its own parent", item_id),
        CheckError::DanglingParent { item_id, parent_id } => {
            format!("{} has missing parent {}", item_id, parent_id)
        }
        CheckError::Cycle { item_ids } => format!("parent cycle: {}", item_ids.join(", ")),
        CheckError::NonContiguousRanks { parent_id, ranks } => format!(
            "ranks under {} are {:?}",
            parent_id.as_deref().unwrap_or("(top level)"),
            ranks
        ),
    }
}

fn describe_warning(warning: &CheckWarning) -> String {
    match warning {
        CheckWarning::HiddenByInactiveAncestor {
            item_id,
            ancestor_id,
        } => format!("{} is active but hidden by {}", item_id, ancestor_id),
        CheckWarning::EmptyTitle { item_id } => format!("{} has no title", item_id),
        CheckWarning::TooDeep {
            item_id,
            depth,
            max_depth,
        } => format!("{} is at depth {} (max {})", item_id, depth, max_depth),
    }
}

/// Parse `<kind>:<id>` into an entity link target.
pub fn parse_link_target(s: &str) -> Result<LinkTarget, String> {
    match s.split_once(':') {
        Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(LinkTarget::Entity {
            kind: kind.to_string(),
            id: id.to_string(),
        }),
        _ => Err(format!("invalid link target \"{}\" (expected <kind>:<id>)", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::MenuItem;
    use crate::model::menu::Menu;
    use crate::ops::relocate::{Placement, Rejection};
    use crate::ops::tree::build_tree;
    use insta::assert_snapshot;

    fn sample_forest() -> Vec<TreeNode> {
        let mut home = MenuItem::new("m-001", "Home").under(None, 0);
        home.payload.url = Some("/".into());
        let mut hidden = MenuItem::new("m-003", "日本").under(None, 2);
        hidden.is_active = false;
        build_tree(&Menu::from_items([
            home,
            MenuItem::new("m-002", "Shop").under(None, 1),
            hidden,
            MenuItem::new("m-004", "Shoes").under(Some("m-002"), 0),
            MenuItem::new("m-005", "Über-Sale Accessories and Much More").under(Some("m-002"), 1),
        ]))
    }

    #[test]
    fn test_tree_text() {
        let output = format_tree(&sample_forest(), 16, false).join("\n");
        assert_snapshot!(output, @r"
Home              m-001 -> /
Shop              m-002
  Shoes           m-004
  Über-Sale Acc…  m-005
日本              m-003 (hidden)
");
    }

    #[test]
    fn test_tree_rows_prefix() {
        let lines = format_tree(&sample_forest(), 8, true);
        assert_eq!(lines[0], "  0  Home      m-001 -> /");
        assert_eq!(lines[3], "  3    Über-…  m-005");
    }

    #[test]
    fn test_format_outcome() {
        let applied = RelocateOutcome {
            applied: true,
            rejection: None,
            placement: Some(Placement {
                item_id: "b".into(),
                parent_id: None,
                index: 2,
            }),
        };
        assert_eq!(format_outcome(&applied, "b"), "b -> (top level) at 2");

        let rejected = RelocateOutcome {
            applied: false,
            rejection: Some(Rejection::AlreadyRoot),
            placement: None,
        };
        assert_eq!(
            format_outcome(&rejected, "b"),
            "b not moved: already at the top level"
        );
    }

    #[test]
    fn test_format_check_lists_problems() {
        let result = CheckResult {
            valid: false,
            errors: vec![CheckError::DanglingParent {
                item_id: "x".into(),
                parent_id: "y".into(),
            }],
            warnings: vec![CheckWarning::EmptyTitle { item_id: "z".into() }],
        };
        assert_eq!(
            format_check(&result),
            vec![
                "Errors:",
                "  x has missing parent y",
                "",
                "Warnings:",
                "  z has no title",
                "✗ menu has errors (run `nt repair`)",
            ]
        );
    }

    #[test]
    fn test_parse_link_target() {
        assert_eq!(
            parse_link_target("category:shoes").unwrap(),
            LinkTarget::Entity {
                kind: "category".into(),
                id: "shoes".into()
            }
        );
        assert!(parse_link_target("shoes").is_err());
        assert!(parse_link_target(":x").is_err());
    }
}
