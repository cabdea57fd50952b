//! Integration tests for the `nt` CLI.
//!
//! Each test initializes a project in a temp directory, runs `nt` as a
//! subprocess, and checks stdout and the stored menu files.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use navtree::model::MenuItem;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn nt(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nt"))
        .args(args)
        .current_dir(dir)
        .env_remove("NAVTREE_LOG")
        .output()
        .expect("failed to run nt")
}

/// Run and return stdout, failing the test on a non-zero exit.
fn ok(dir: &Path, args: &[&str]) -> String {
    let out = nt(dir, args);
    assert!(
        out.status.success(),
        "nt {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout).unwrap()
}

/// Run expecting failure and return stderr.
fn fails(dir: &Path, args: &[&str]) -> String {
    let out = nt(dir, args);
    assert!(!out.status.success(), "nt {:?} unexpectedly succeeded", args);
    String::from_utf8(out.stderr).unwrap()
}

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    ok(tmp.path(), &["init", "--name", "Shop"]);
    tmp
}

/// Project with root items a, b, c
fn project_abc() -> TempDir {
    let tmp = project();
    for id in ["a", "b", "c"] {
        ok(tmp.path(), &["add", &id.to_uppercase(), "--id", id]);
    }
    tmp
}

fn stored(dir: &Path, menu: &str) -> Vec<MenuItem> {
    let path = dir.join(format!("navtree/menus/{}.json", menu));
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn stored_item(dir: &Path, id: &str) -> MenuItem {
    stored(dir, "main")
        .into_iter()
        .find(|i| i.id == id)
        .unwrap_or_else(|| panic!("no stored item {}", id))
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).unwrap()
}

// ---------------------------------------------------------------------------
// Project setup
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_default_menu() {
    let tmp = TempDir::new().unwrap();
    let out = ok(tmp.path(), &["init", "--name", "Shop"]);
    assert_eq!(out, "Initialized navtree project: Shop\n  menu: Main (main)\n");
    assert!(tmp.path().join("navtree/navtree.toml").is_file());
    assert!(tmp.path().join("navtree/menus").is_dir());

    let menus = json(&ok(tmp.path(), &["menus", "--json"]));
    assert_eq!(menus[0]["id"], "main");
    assert_eq!(menus[0]["items"], 0);

    let err = fails(tmp.path(), &["init"]);
    assert!(err.contains("already exists"), "stderr: {}", err);
}

#[test]
fn commands_outside_a_project_fail() {
    let tmp = TempDir::new().unwrap();
    let err = fails(tmp.path(), &["tree"]);
    assert!(err.contains("not a navtree project"), "stderr: {}", err);
}

#[test]
fn project_dir_flag_and_menu_selection() {
    let tmp = project();
    let elsewhere = TempDir::new().unwrap();
    let root = tmp.path().to_str().unwrap();

    let err = fails(elsewhere.path(), &["-C", root, "-m", "footer", "tree"]);
    assert!(err.contains("unknown menu \"footer\""), "stderr: {}", err);

    let out = ok(elsewhere.path(), &["-C", root, "menus", "add", "footer", "Footer"]);
    assert_eq!(out, "added menu Footer (footer)\n");
    let out = ok(elsewhere.path(), &["-C", root, "-m", "footer", "add", "Contact"]);
    assert_eq!(out, "footer-001\n");
    assert_eq!(stored(tmp.path(), "footer").len(), 1);
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[test]
fn add_and_show_tree() {
    let tmp = project();
    assert_eq!(ok(tmp.path(), &["add", "Home"]), "main-001\n");
    assert_eq!(ok(tmp.path(), &["add", "Shop"]), "main-002\n");
    assert_eq!(ok(tmp.path(), &["add", "Shoes", "--parent", "main-002"]), "main-003\n");

    let out = ok(tmp.path(), &["tree", "--rows"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("  0  Home "));
    assert!(lines[2].starts_with("  2    Shoes "));
    assert!(lines[2].ends_with("  main-003"));

    let tree = json(&ok(tmp.path(), &["tree", "--json"]));
    assert_eq!(tree["menu"], "main");
    assert_eq!(tree["items"][1]["children"][0]["id"], "main-003");
}

#[test]
fn indent_and_outdent() {
    let tmp = project_abc();

    assert_eq!(ok(tmp.path(), &["indent", "c"]), "c -> b at 0\nsaved 1 record(s)\n");
    assert_eq!(stored_item(tmp.path(), "c").parent_id.as_deref(), Some("b"));

    assert_eq!(
        ok(tmp.path(), &["outdent", "c"]),
        "c -> (top level) at 2\nsaved 1 record(s)\n"
    );
    let c = stored_item(tmp.path(), "c");
    assert_eq!(c.parent_id, None);
    assert_eq!(c.sort_order, 2);

    assert_eq!(
        ok(tmp.path(), &["outdent", "c"]),
        "c not moved: already at the top level\n"
    );
    assert_eq!(
        ok(tmp.path(), &["indent", "a"]),
        "a not moved: no preceding sibling to indent under\n"
    );
}

#[test]
fn drag_reorders_nests_and_promotes() {
    let tmp = project_abc();

    // rows a, b, c: drop c on a's row
    assert_eq!(
        ok(tmp.path(), &["drag", "c", "--slot", "0"]),
        "c -> (top level) at 0\nsaved 3 record(s)\n"
    );

    // rows c, a, b: drop b on a's row pushed right, nesting under c
    let out = json(&ok(
        tmp.path(),
        &["drag", "b", "--slot", "1", "--dx", "50", "--json"],
    ));
    assert_eq!(out["applied"], true);
    assert_eq!(out["placement"]["parent_id"], "c");
    assert_eq!(out["placement"]["index"], 0);
    assert_eq!(stored_item(tmp.path(), "b").parent_id.as_deref(), Some("c"));

    // rows c, b, a: pull b back out to the left
    assert_eq!(
        ok(tmp.path(), &["drag", "b", "--slot", "1", "--dx", "-50"]),
        "b -> (top level) at 1\nsaved 2 record(s)\n"
    );
    let order: Vec<String> = {
        let mut roots = stored(tmp.path(), "main");
        roots.sort_by_key(|i| i.sort_order);
        roots.into_iter().map(|i| i.id).collect()
    };
    assert_eq!(order, vec!["c", "b", "a"]);
}

#[test]
fn mv_places_explicitly() {
    let tmp = project_abc();
    assert_eq!(
        ok(tmp.path(), &["mv", "c", "0", "--parent", "a"]),
        "c -> a at 0\nsaved 1 record(s)\n"
    );
    assert_eq!(
        ok(tmp.path(), &["mv", "a", "0", "--parent", "c"]),
        "a not moved: would nest the item under itself\n"
    );
    let err = fails(tmp.path(), &["mv", "a", "0"]);
    assert!(err.contains("--parent"), "stderr: {}", err);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn rm_promotes_children_and_logs_recovery() {
    let tmp = project_abc();
    ok(tmp.path(), &["add", "B1", "--id", "b1", "--parent", "b"]);
    ok(tmp.path(), &["add", "B2", "--id", "b2", "--parent", "b"]);

    assert_eq!(ok(tmp.path(), &["rm", "b"]), "deleted b\nsaved 3 record(s)\n");
    let b1 = stored_item(tmp.path(), "b1");
    assert_eq!(b1.parent_id, None);
    assert_eq!(b1.sort_order, 1);
    assert_eq!(stored_item(tmp.path(), "c").sort_order, 3);
    assert!(ok(tmp.path(), &["check"]).ends_with("✓ menu is valid\n"));

    let log = json(&ok(tmp.path(), &["recovery", "--json"]));
    assert_eq!(log[0]["category"], "delete");
    assert_eq!(log[0]["body"][0]["id"], "b");
}

#[test]
fn rm_cascade_and_reject() {
    let tmp = project_abc();
    ok(tmp.path(), &["add", "A1", "--id", "a1", "--parent", "a"]);

    let err = fails(tmp.path(), &["rm", "a", "--policy", "reject"]);
    assert!(err.contains("a has 1 children"), "stderr: {}", err);

    let out = json(&ok(tmp.path(), &["rm", "a", "--policy", "cascade", "--json"]));
    assert_eq!(out["removed"], serde_json::json!(["a", "a1"]));
    assert_eq!(stored(tmp.path(), "main").len(), 2);
}

#[test]
fn links_and_visibility() {
    let tmp = project();
    let config = tmp.path().join("navtree/navtree.toml");
    let mut text = fs::read_to_string(&config).unwrap();
    text.push_str("\n[[links]]\nkind = \"category\"\nid = \"shoes\"\npath = \"/c/shoes\"\n");
    fs::write(&config, text).unwrap();

    ok(tmp.path(), &["add", "Shoes", "--id", "shoes", "--link", "category:shoes"]);
    assert_eq!(
        stored_item(tmp.path(), "shoes").payload.url.as_deref(),
        Some("/c/shoes")
    );

    assert_eq!(
        ok(tmp.path(), &["link", "shoes", "--url", "https://shop.test/s"]),
        "shoes -> https://shop.test/s\n"
    );
    let err = fails(tmp.path(), &["link", "shoes", "product:9"]);
    assert!(err.contains("no route configured for product:9"), "stderr: {}", err);

    assert_eq!(ok(tmp.path(), &["deactivate", "shoes"]), "shoes is now hidden\n");
    assert_eq!(ok(tmp.path(), &["deactivate", "shoes"]), "shoes is already hidden\n");
    let active = json(&ok(tmp.path(), &["tree", "--active", "--json"]));
    assert_eq!(active["items"], serde_json::json!([]));
    assert!(ok(tmp.path(), &["tree"]).contains("shoes (hidden)"));

    assert_eq!(ok(tmp.path(), &["link", "shoes", "--clear"]), "shoes: link cleared\n");
    assert_eq!(stored_item(tmp.path(), "shoes").payload.link, None);

    ok(tmp.path(), &["title", "shoes", "All shoes"]);
    assert_eq!(stored_item(tmp.path(), "shoes").title(), "All shoes");
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

#[test]
fn check_and_repair_damaged_menu() {
    let tmp = project();
    fs::write(
        tmp.path().join("navtree/menus/main.json"),
        r#"[
  {"id": "a", "title": "A", "sort_order": 0},
  {"id": "b", "title": "B", "sort_order": 5},
  {"id": "x", "parent_id": "gone", "title": "X", "sort_order": 0}
]"#,
    )
    .unwrap();

    let out = ok(tmp.path(), &["check"]);
    assert!(out.contains("x has missing parent gone"), "stdout: {}", out);
    assert!(out.ends_with("✗ menu has errors (run `nt repair`)\n"));

    assert_eq!(ok(tmp.path(), &["repair"]), "repaired 2 record(s)\n");
    assert!(ok(tmp.path(), &["check"]).ends_with("✓ menu is valid\n"));
    assert_eq!(ok(tmp.path(), &["repair"]), "nothing to repair\n");

    let x = stored_item(tmp.path(), "x");
    assert_eq!(x.parent_id, None);
    assert_eq!(x.sort_order, 1);
    assert_eq!(stored_item(tmp.path(), "b").sort_order, 2);

    let log = json(&ok(tmp.path(), &["recovery", "--json"]));
    assert_eq!(log[0]["category"], "repair");
    assert_eq!(ok(tmp.path(), &["recovery", "prune", "--all"]), "pruned 1 entry\n");
    assert_eq!(ok(tmp.path(), &["recovery"]), "recovery log is empty\n");
}
