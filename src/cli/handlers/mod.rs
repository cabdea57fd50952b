mod init;
pub use init::cmd_init;

use std::error::Error;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::editor::{Editor, RelocateOutcome, SaveReport};
use crate::io::config_io;
use crate::io::file_store::FileStore;
use crate::io::links::{LinkResolver, RouteTable};
use crate::io::project_io;
use crate::io::recovery;
use crate::io::store::{ItemStore, validate_menu_id};
use crate::model::config::MenuConfig;
use crate::model::item::{ItemPayload, LinkTarget};
use crate::model::project::Project;
use crate::ops::item_ops::NewItem;
use crate::ops::relocate::{DragMove, Gesture};

type CmdResult = Result<(), Box<dyn Error>>;

/// Global flags every handler sees
struct Context {
    json: bool,
    project_dir: Option<PathBuf>,
    menu: Option<String>,
}

impl Context {
    fn root(&self) -> Result<PathBuf, Box<dyn Error>> {
        match &self.project_dir {
            Some(dir) => std::fs::canonicalize(dir)
                .map_err(|e| format!("cannot resolve -C path '{}': {}", dir.display(), e).into()),
            None => Ok(std::env::current_dir()?),
        }
    }

    fn load_project(&self) -> Result<Project, Box<dyn Error>> {
        let root = project_io::discover_project(&self.root()?)?;
        Ok(project_io::load_project(&root)?)
    }

    /// Open the selected menu on the project's file store.
    fn open_editor(&self, project: &Project) -> Result<Editor<FileStore>, Box<dyn Error>> {
        let menu_id = match &self.menu {
            Some(id) => id.as_str(),
            None => project
                .default_menu()
                .ok_or("no menus configured; add one with `nt menus add <id> <name>`")?,
        };
        if project.menu_config(menu_id).is_none() {
            return Err(format!("unknown menu \"{}\"", menu_id).into());
        }
        let store = FileStore::new(&project.navtree_dir);
        let editor = Editor::load(store, menu_id, project.config.relocation)?
            .with_recovery_dir(&project.navtree_dir);
        Ok(editor)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let ctx = Context {
        json: cli.json,
        project_dir: cli.project_dir.map(PathBuf::from),
        menu: cli.menu,
    };

    match cli.command {
        Commands::Init(args) => cmd_init(args, &ctx.root()?),
        Commands::Menus(args) => cmd_menus(&ctx, args),
        Commands::Tree(args) => cmd_tree(&ctx, args),
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Drag(args) => cmd_gesture(
            &ctx,
            Gesture::Drag(DragMove {
                item_id: args.id,
                target_slot: args.slot,
                horizontal_delta: args.dx,
            }),
        ),
        Commands::Indent(args) => cmd_gesture(&ctx, Gesture::Indent { item_id: args.id }),
        Commands::Outdent(args) => cmd_gesture(&ctx, Gesture::Outdent { item_id: args.id }),
        Commands::Mv(args) => cmd_mv(&ctx, args),
        Commands::Rm(args) => cmd_rm(&ctx, args),
        Commands::Title(args) => cmd_title(&ctx, args),
        Commands::Link(args) => cmd_link(&ctx, args),
        Commands::Activate(args) => cmd_set_active(&ctx, &args.id, true),
        Commands::Deactivate(args) => cmd_set_active(&ctx, &args.id, false),
        Commands::Check => cmd_check(&ctx),
        Commands::Repair => cmd_repair(&ctx),
        Commands::Recovery(args) => cmd_recovery(&ctx, args),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_saved(report: &SaveReport) {
    if let Some(line) = format_save(report) {
        println!("{}", line);
    }
}

// ---------------------------------------------------------------------------
// Menus and reading
// ---------------------------------------------------------------------------

fn cmd_menus(ctx: &Context, args: MenusCmd) -> CmdResult {
    let project = ctx.load_project()?;
    match args.action {
        Some(MenusAction::Add(add)) => {
            validate_menu_id(&add.id)?;
            if project.menu_config(&add.id).is_some() {
                return Err(format!("menu \"{}\" already exists", add.id).into());
            }
            let (_, mut doc) = config_io::read_config(&project.navtree_dir)?;
            config_io::add_menu_to_config(
                &mut doc,
                &MenuConfig {
                    id: add.id.clone(),
                    name: add.name.clone(),
                },
            );
            config_io::write_config(&project.navtree_dir, &doc)?;
            println!("added menu {} ({})", add.name, add.id);
            Ok(())
        }
        None => {
            let store = FileStore::new(&project.navtree_dir);
            let mut menus = Vec::new();
            for menu in &project.config.menus {
                menus.push(MenuInfoJson {
                    id: menu.id.clone(),
                    name: menu.name.clone(),
                    items: store.list(&menu.id)?.len(),
                });
            }
            if ctx.json {
                return print_json(&menus);
            }
            for menu in &menus {
                println!("{:<16} {:<24} {} item(s)", menu.id, menu.name, menu.items);
            }
            Ok(())
        }
    }
}

fn cmd_tree(ctx: &Context, args: TreeArgs) -> CmdResult {
    let project = ctx.load_project()?;
    let editor = ctx.open_editor(&project)?;
    let forest = if args.active {
        editor.active_forest()
    } else {
        editor.forest()
    };
    if ctx.json {
        return print_json(&TreeJson {
            menu: editor.menu_id(),
            items: &forest,
        });
    }
    for line in format_tree(&forest, TITLE_WIDTH, args.rows) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_check(ctx: &Context) -> CmdResult {
    let project = ctx.load_project()?;
    let editor = ctx.open_editor(&project)?;
    let result = editor.check();
    if ctx.json {
        return print_json(&result);
    }
    for line in format_check(&result) {
        println!("{}", line);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

fn report_move(ctx: &Context, item_id: &str, outcome: &RelocateOutcome, report: &SaveReport) -> CmdResult {
    if ctx.json {
        return print_json(&GestureJson {
            outcome,
            saved: &report.patches,
        });
    }
    println!("{}", format_outcome(outcome, item_id));
    print_saved(report);
    Ok(())
}

fn cmd_gesture(ctx: &Context, gesture: Gesture) -> CmdResult {
    let project = ctx.load_project()?;
    let mut editor = ctx.open_editor(&project)?;
    let outcome = editor.relocate(&gesture)?;
    let report = editor.save()?;
    report_move(ctx, gesture.item_id(), &outcome, &report)
}

fn cmd_mv(ctx: &Context, args: MvArgs) -> CmdResult {
    if args.parent.is_none() && !args.root {
        return Err("give --parent <id> or --root".into());
    }
    let project = ctx.load_project()?;
    let mut editor = ctx.open_editor(&project)?;
    let outcome = editor.place(&args.id, args.parent.as_deref(), args.index)?;
    let report = editor.save()?;
    report_move(ctx, &args.id, &outcome, &report)
}

fn cmd_repair(ctx: &Context) -> CmdResult {
    let project = ctx.load_project()?;
    let mut editor = ctx.open_editor(&project)?;
    let rewritten = editor.repair();
    let report = editor.save()?;
    if ctx.json {
        return print_json(&report);
    }
    if rewritten == 0 {
        println!("nothing to repair");
    } else {
        println!("repaired {} record(s)", rewritten);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Item lifecycle
// ---------------------------------------------------------------------------

/// Build a link target from `<kind>:<id>` or a custom URL.
fn link_from_args(target: Option<String>, url: Option<String>) -> Result<Option<LinkTarget>, String> {
    match (target, url) {
        (Some(target), _) => parse_link_target(&target).map(Some),
        (None, Some(url)) => Ok(Some(LinkTarget::Custom { url })),
        (None, None) => Ok(None),
    }
}

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let project = ctx.load_project()?;
    let mut editor = ctx.open_editor(&project)?;
    let routes = RouteTable::new(&project.config.links);

    let link = link_from_args(args.link, args.url)?;
    let url = link.as_ref().map(|t| routes.resolve(t)).transpose()?;
    let item = editor.add_item(NewItem {
        id: args.id,
        parent_id: args.parent,
        payload: ItemPayload {
            title: args.title,
            link,
            url,
            new_tab: args.new_tab,
            icon: None,
        },
        is_active: !args.inactive,
    })?;
    editor.save()?;

    if ctx.json {
        return print_json(&item);
    }
    println!("{}", item.id);
    Ok(())
}

fn cmd_rm(ctx: &Context, args: RmArgs) -> CmdResult {
    let project = ctx.load_project()?;
    let mut editor = ctx.open_editor(&project)?;
    let policy = args.policy.unwrap_or(project.config.delete.policy);
    let report = editor.delete_item(&args.id, policy)?;

    if ctx.json {
        return print_json(&RemovedJson {
            removed: &report.removed,
            saved: &report.saved.patches,
        });
    }
    println!("deleted {}", report.removed.join(", "));
    print_saved(&report.saved);
    Ok(())
}

fn cmd_title(ctx: &Context, args: TitleArgs) -> CmdResult {
    let project = ctx.load_project()?;
    let mut editor = ctx.open_editor(&project)?;
    editor.rename(&args.id, args.title)?;
    println!("{}: \"{}\"", args.id, editor.menu().get(&args.id).map_or("", |i| i.title()));
    Ok(())
}

fn cmd_link(ctx: &Context, args: LinkArgs) -> CmdResult {
    let link = link_from_args(args.target, args.url)?;
    if link.is_none() && !args.clear {
        return Err("give a <kind>:<id> target, --url, or --clear".into());
    }
    let project = ctx.load_project()?;
    let mut editor = ctx.open_editor(&project)?;
    let routes = RouteTable::new(&project.config.links);
    editor.set_link(&args.id, link, &routes)?;

    let item = editor
        .menu()
        .get(&args.id)
        .ok_or_else(|| format!("item not found: {}", args.id))?;
    if ctx.json {
        return print_json(item);
    }
    match &item.payload.url {
        Some(url) => println!("{} -> {}", item.id, url),
        None => println!("{}: link cleared", item.id),
    }
    Ok(())
}

fn cmd_set_active(ctx: &Context, id: &str, active: bool) -> CmdResult {
    let project = ctx.load_project()?;
    let mut editor = ctx.open_editor(&project)?;
    let changed = editor.set_active(id, active)?;
    let state = if active { "shown" } else { "hidden" };
    if changed {
        println!("{} is now {}", id, state);
    } else {
        println!("{} is already {}", id, state);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

/// Accept a full RFC 3339 timestamp or a plain date (midnight UTC).
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid timestamp \"{}\" (use YYYY-MM-DD or RFC 3339)", s))
}

fn cmd_recovery(ctx: &Context, args: RecoveryCmd) -> CmdResult {
    let project = ctx.load_project()?;
    let dir = &project.navtree_dir;
    match args.action {
        Some(RecoveryAction::Path) => {
            println!("{}", recovery::recovery_log_path(dir).display());
            Ok(())
        }
        Some(RecoveryAction::Prune(prune)) => {
            let before = prune.before.as_deref().map(parse_timestamp).transpose()?;
            let removed = recovery::prune_recovery(dir, before, prune.all)?;
            println!("pruned {} entr{}", removed, if removed == 1 { "y" } else { "ies" });
            Ok(())
        }
        None => {
            let entries = recovery::read_recovery_entries(dir, Some(args.limit.unwrap_or(10)));
            if ctx.json {
                let values: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
                return print_json(&values);
            }
            if entries.is_empty() {
                println!("recovery log is empty");
            }
            for entry in &entries {
                print!("{}", entry.to_display_markdown());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_forms() {
        let date = parse_timestamp("2026-02-03").unwrap();
        assert_eq!(date.to_rfc3339(), "2026-02-03T00:00:00+00:00");
        let full = parse_timestamp("2026-02-03T04:05:06+02:00").unwrap();
        assert_eq!(full.to_rfc3339(), "2026-02-03T02:05:06+00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_link_from_args() {
        assert_eq!(link_from_args(None, None).unwrap(), None);
        assert_eq!(
            link_from_args(None, Some("/x".into())).unwrap(),
            Some(LinkTarget::Custom { url: "/x".into() })
        );
        assert!(link_from_args(Some("bad".into()), None).is_err());
    }
}
