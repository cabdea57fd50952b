//! End-to-end checks of the relocation engine over a realistic menu: long
//! pseudo-random gesture sequences must keep the stored structure valid, and
//! the editor must reconcile with its store.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use navtree::editor::{Editor, SaveError};
use navtree::io::memory_store::MemoryStore;
use navtree::io::store::ItemStore;
use navtree::model::{DeletePolicy, Menu, MenuItem, RelocationConfig};
use navtree::ops::check::check_menu;
use navtree::ops::item_ops::NewItem;
use navtree::ops::relocate::{DragMove, Gesture, Rejection};
use navtree::ops::tree::{build_tree, flatten};
use pretty_assertions::assert_eq;

fn fixture() -> Vec<MenuItem> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/storefront.json");
    let text = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("could not read {}: {}", path.display(), e));
    serde_json::from_str(&text).unwrap()
}

fn open(rules: RelocationConfig) -> Editor<MemoryStore> {
    Editor::load(MemoryStore::with_menu("main", fixture()), "main", rules).unwrap()
}

/// `{id, parent_id, sort_order}` of every record, order ignored
fn structure(items: &[MenuItem]) -> BTreeSet<(String, Option<String>, u32)> {
    items
        .iter()
        .map(|i| (i.id.clone(), i.parent_id.clone(), i.sort_order))
        .collect()
}

fn assert_valid(menu: &Menu, rules: &RelocationConfig, step: usize) {
    let result = check_menu(menu, rules);
    assert!(result.valid, "step {}: {:?}", step, result.errors);
    let items: Vec<MenuItem> = menu.items().cloned().collect();
    assert_eq!(
        structure(&flatten(&build_tree(menu))),
        structure(&items),
        "step {}: round trip changed structure",
        step
    );
}

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as usize
    }

    fn below(&mut self, n: usize) -> usize {
        self.next() % n.max(1)
    }
}

fn random_gesture(rng: &mut Lcg, menu: &Menu) -> Gesture {
    let ids: Vec<&str> = {
        let mut ids: Vec<&str> = menu.items().map(|i| i.id.as_str()).collect();
        ids.sort();
        ids
    };
    let item_id = ids[rng.below(ids.len())].to_string();
    match rng.below(4) {
        0 => Gesture::Indent { item_id },
        1 => Gesture::Outdent { item_id },
        _ => {
            let rows = menu.len() - menu.descendants(&item_id).len();
            let dx = [-80, -36, -10, 0, 10, 36, 80][rng.below(7)];
            Gesture::Drag(DragMove {
                item_id,
                target_slot: rng.below(rows),
                horizontal_delta: dx,
            })
        }
    }
}

fn run_sequence(seed: u64, rules: RelocationConfig, steps: usize) -> Editor<MemoryStore> {
    let mut rng = Lcg(seed);
    let mut editor = open(rules);
    for step in 0..steps {
        match rng.below(20) {
            0 if editor.menu().len() > 4 => {
                let ids: Vec<String> = editor.menu().sibling_ids(None);
                let policy = if rng.below(2) == 0 {
                    DeletePolicy::Promote
                } else {
                    DeletePolicy::Cascade
                };
                editor.delete_item(&ids[rng.below(ids.len())], policy).unwrap();
            }
            1 => {
                editor.add_item(NewItem::titled(format!("Item {}", step))).unwrap();
            }
            2 => {
                editor.save().unwrap();
            }
            _ => {
                let gesture = random_gesture(&mut rng, editor.menu());
                editor.relocate(&gesture).unwrap();
            }
        }
        assert_valid(editor.menu(), &rules, step);
    }
    editor
}

#[test]
fn fixture_is_valid() {
    let menu = Menu::from_items(fixture());
    assert_valid(&menu, &RelocationConfig::default(), 0);
    assert_eq!(build_tree(&menu).len(), 4);
}

#[test]
fn gesture_sequences_preserve_invariants() {
    for seed in [1, 7, 42, 2024] {
        let rules = RelocationConfig::default();
        let mut editor = run_sequence(seed, rules, 400);

        // Whatever was staged lands intact in the store
        editor.save().unwrap();
        let stored = Menu::from_items(editor.store().list("main").unwrap());
        assert_eq!(structure(&stored.into_items()), {
            let items: Vec<MenuItem> = editor.menu().items().cloned().collect();
            structure(&items)
        });
        assert!(!editor.is_dirty());
    }
}

#[test]
fn depth_limit_holds_across_sequences() {
    let rules = RelocationConfig {
        max_depth: Some(2),
        ..RelocationConfig::default()
    };
    for seed in [3, 99] {
        let editor = run_sequence(seed, rules, 300);
        for item in editor.menu().items() {
            let depth = editor.menu().depth(&item.id).unwrap();
            assert!(depth <= 2, "seed {}: {} at depth {}", seed, item.id, depth);
        }
    }
}

#[test]
fn no_op_gestures_leave_records_identical() {
    let mut editor = open(RelocationConfig::default());
    let before = serde_json::to_string(&flatten(&editor.forest())).unwrap();

    let outdent_root = editor
        .relocate(&Gesture::Outdent {
            item_id: "home".into(),
        })
        .unwrap();
    assert_eq!(outdent_root.rejection, Some(Rejection::AlreadyRoot));

    let indent_first = editor
        .relocate(&Gesture::Indent {
            item_id: "men".into(),
        })
        .unwrap();
    assert_eq!(indent_first.rejection, Some(Rejection::NoPrecedingSibling));

    assert_eq!(serde_json::to_string(&flatten(&editor.forest())).unwrap(), before);
    assert!(!editor.is_dirty());
}

#[test]
fn cross_group_drag_touches_two_groups_only() {
    let mut editor = open(RelocationConfig::default());
    // rows: home, shop, men, men-shoes, men-shirts, women, women-dresses,
    //       women-bags, women-sale, kids, journal, about, contact, careers
    // drop careers onto the women-bags row
    let outcome = editor
        .relocate(&Gesture::Drag(DragMove {
            item_id: "careers".into(),
            target_slot: 7,
            horizontal_delta: 0,
        }))
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(
        editor.menu().sibling_ids(Some("women")),
        vec!["women-dresses", "careers", "women-bags", "women-sale"]
    );

    let mut touched: Vec<String> = editor.pending_changes().into_iter().map(|p| p.id).collect();
    touched.sort();
    assert_eq!(touched, vec!["careers", "women-bags", "women-sale"]);
}

#[test]
fn failed_save_keeps_store_authoritative() {
    let mut editor = open(RelocationConfig::default());
    editor
        .relocate(&Gesture::Indent {
            item_id: "journal".into(),
        })
        .unwrap();
    assert!(editor.is_dirty());

    // Someone else renames an item while the save is failing
    let mut renamed = fixture()[0].clone();
    renamed.payload.title = "Start".into();
    editor.store_mut().update("main", &renamed).unwrap();
    editor.store_mut().fail_next_upsert();

    let err = editor.save().unwrap_err();
    assert!(matches!(err, SaveError::Rejected { .. }));
    assert!(!editor.is_dirty());
    assert_eq!(editor.menu().get("journal").unwrap().parent_id, None);
    assert_eq!(editor.menu().get("home").unwrap().title(), "Start");
}
