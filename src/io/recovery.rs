use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use crate::io::lock::FileLock;
use crate::model::item::{ItemPatch, MenuItem};

/// Size above which old entries are pruned before appending (1 MB).
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Default number of days before entries are prunable.
pub const PRUNE_AGE_DAYS: i64 = 30;

const FILE_HEADER: &str = "\
<!-- navtree recovery log: menu changes that could not be kept.
     Failed saves, deleted items and repaired records land here.
     View with: nt recovery
     Prune old entries: nt recovery --prune
     Safe to delete if empty or stale. -->

---
";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// Staged relocations dropped after the store refused a save
    Save,
    /// Records removed by a delete
    Delete,
    /// Records rewritten by `nt repair`
    Repair,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Save => write!(f, "save"),
            RecoveryCategory::Delete => write!(f, "delete"),
            RecoveryCategory::Repair => write!(f, "repair"),
        }
    }
}

impl RecoveryCategory {
    pub fn parse_category(s: &str) -> Option<Self> {
        match s {
            "save" => Some(RecoveryCategory::Save),
            "delete" => Some(RecoveryCategory::Delete),
            "repair" => Some(RecoveryCategory::Repair),
            _ => None,
        }
    }
}

/// A single entry in the recovery log.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub menu_id: String,
    pub description: String,
    /// JSON of the records or patches involved
    pub body: String,
}

/// Return the path to the recovery log file.
pub fn recovery_log_path(dir: &Path) -> PathBuf {
    dir.join(".recovery.log")
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

impl RecoveryEntry {
    fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} [{}] {}\n\nMenu: {}\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.category,
            self.description,
            self.menu_id,
        );
        if !self.body.is_empty() {
            out.push_str("\n```json\n");
            out.push_str(self.body.trim_end());
            out.push_str("\n```\n");
        }
        out.push_str("\n---\n");
        out
    }

    /// Serialize to JSON value for `nt recovery --json`.
    pub fn to_json(&self) -> serde_json::Value {
        let body = serde_json::from_str::<serde_json::Value>(&self.body)
            .unwrap_or_else(|_| serde_json::Value::String(self.body.clone()));
        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "menu": self.menu_id,
            "description": self.description,
            "body": body,
        })
    }

    pub fn to_display_markdown(&self) -> String {
        self.to_markdown()
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Append an entry. Failures are reported through tracing and otherwise
/// ignored: the log must never block the operation it records.
pub fn log_recovery(dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = append_entry(dir, &entry) {
        tracing::warn!(error = %e, "could not write to recovery log");
    }
}

fn append_entry(dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let path = recovery_log_path(dir);
    if std::fs::metadata(&path).is_ok_and(|m| m.len() > MAX_LOG_SIZE) {
        let cutoff = Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS);
        let content = std::fs::read_to_string(&path)?;
        atomic_write(&path, prune_entries_before(&content, &cutoff).as_bytes())?;
    }

    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

/// Record staged changes that a failed save threw away.
pub fn log_discarded_save(dir: &Path, menu_id: &str, patches: &[ItemPatch], reason: &str) {
    log_recovery(
        dir,
        RecoveryEntry {
            timestamp: Utc::now(),
            category: RecoveryCategory::Save,
            menu_id: menu_id.to_string(),
            description: format!("{} staged change(s) discarded: {}", patches.len(), reason),
            body: serde_json::to_string_pretty(patches).unwrap_or_default(),
        },
    );
}

/// Record full copies of deleted items so they can be recreated by hand.
pub fn log_deletion(dir: &Path, menu_id: &str, items: &[MenuItem]) {
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    log_recovery(
        dir,
        RecoveryEntry {
            timestamp: Utc::now(),
            category: RecoveryCategory::Delete,
            menu_id: menu_id.to_string(),
            description: format!("deleted {}", ids.join(", ")),
            body: serde_json::to_string_pretty(items).unwrap_or_default(),
        },
    );
}

/// Record the pre-repair state of every record a repair rewrote.
pub fn log_repair(dir: &Path, menu_id: &str, before: &[MenuItem]) {
    log_recovery(
        dir,
        RecoveryEntry {
            timestamp: Utc::now(),
            category: RecoveryCategory::Repair,
            menu_id: menu_id.to_string(),
            description: format!("repaired {} record(s)", before.len()),
            body: serde_json::to_string_pretty(before).unwrap_or_default(),
        },
    );
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read entries, most recent first.
pub fn read_recovery_entries(dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let Ok(content) = std::fs::read_to_string(recovery_log_path(dir)) else {
        return Vec::new();
    };
    let mut entries = parse_entries(&content);
    entries.reverse();
    if let Some(n) = limit {
        entries.truncate(n);
    }
    entries
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some((timestamp, category, description)) =
            line.strip_prefix("## ").and_then(parse_entry_header)
        else {
            continue;
        };
        let mut menu_id = String::new();
        let mut body = Vec::new();
        let mut in_body = false;
        for line in lines.by_ref() {
            if in_body {
                if line == "```" {
                    in_body = false;
                } else {
                    body.push(line);
                }
            } else if line == "---" {
                break;
            } else if line.starts_with("```") {
                in_body = true;
            } else if let Some(menu) = line.strip_prefix("Menu: ") {
                menu_id = menu.to_string();
            }
        }
        entries.push(RecoveryEntry {
            timestamp,
            category,
            menu_id,
            description,
            body: body.join("\n"),
        });
    }
    entries
}

/// Parse `<timestamp> [<category>] <description>`
fn parse_entry_header(header: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let (timestamp, rest) = header.split_once(" [")?;
    let (category, description) = rest.split_once("] ")?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .ok()?
        .with_timezone(&Utc);
    let category = RecoveryCategory::parse_category(category)?;
    Some((timestamp, category, description.to_string()))
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Drop entries older than `before` (default: `PRUNE_AGE_DAYS`), or all of
/// them. Returns how many were removed.
pub fn prune_recovery(dir: &Path, before: Option<DateTime<Utc>>, all: bool) -> io::Result<usize> {
    let path = recovery_log_path(dir);
    if !path.exists() {
        return Ok(0);
    }
    let _lock = FileLock::acquire(dir, Duration::from_secs(1))
        .map_err(|e| io::Error::new(io::ErrorKind::WouldBlock, e.to_string()))?;

    let content = std::fs::read_to_string(&path)?;
    let count_before = parse_entries(&content).len();
    let kept = if all {
        FILE_HEADER.to_string()
    } else {
        let cutoff =
            before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS));
        prune_entries_before(&content, &cutoff)
    };
    atomic_write(&path, kept.as_bytes())?;
    Ok(count_before - parse_entries(&kept).len())
}

/// Keep the file header and every entry stamped at or after `cutoff`.
fn prune_entries_before(content: &str, cutoff: &DateTime<Utc>) -> String {
    let mut out = String::new();
    let mut entry = String::new();
    let mut keep = false;
    let mut in_header = true;

    for line in content.lines() {
        if in_header {
            out.push_str(line);
            out.push('\n');
            in_header = line != "---";
            continue;
        }
        if let Some(header) = line.strip_prefix("## ") {
            if keep {
                out.push_str(&entry);
            }
            entry.clear();
            keep = parse_entry_header(header).is_some_and(|(ts, _, _)| ts >= *cutoff);
        }
        entry.push_str(line);
        entry.push('\n');
    }
    if keep {
        out.push_str(&entry);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry_at(ts: &str, category: RecoveryCategory) -> RecoveryEntry {
        RecoveryEntry {
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            category,
            menu_id: "main".into(),
            description: "something happened".into(),
            body: "[\n  {\"id\": \"a\"}\n]".into(),
        }
    }

    #[test]
    fn test_log_and_read_round_trip() {
        let tmp = TempDir::new().unwrap();
        let first = entry_at("2026-01-01T10:00:00Z", RecoveryCategory::Delete);
        let second = entry_at("2026-01-02T10:00:00Z", RecoveryCategory::Save);
        log_recovery(tmp.path(), first.clone());
        log_recovery(tmp.path(), second.clone());

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries, vec![second.clone(), first]);

        let limited = read_recovery_entries(tmp.path(), Some(1));
        assert_eq!(limited, vec![second]);
    }

    #[test]
    fn test_header_written_once() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry_at("2026-01-01T10:00:00Z", RecoveryCategory::Save));
        log_recovery(tmp.path(), entry_at("2026-01-01T11:00:00Z", RecoveryCategory::Save));
        let content = std::fs::read_to_string(recovery_log_path(tmp.path())).unwrap();
        assert_eq!(content.matches("navtree recovery log").count(), 1);
    }

    #[test]
    fn test_discarded_save_body_is_patch_json() {
        let tmp = TempDir::new().unwrap();
        let patches = vec![ItemPatch {
            id: "b".into(),
            parent_id: Some(Some("a".into())),
            sort_order: 0,
        }];
        log_discarded_save(tmp.path(), "main", &patches, "store unavailable");
        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Save);
        let parsed: Vec<ItemPatch> = serde_json::from_str(&entries[0].body).unwrap();
        assert_eq!(parsed, patches);
    }

    #[test]
    fn test_prune_before_cutoff() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry_at("2020-01-01T00:00:00Z", RecoveryCategory::Repair));
        log_recovery(tmp.path(), entry_at("2026-06-01T00:00:00Z", RecoveryCategory::Delete));
        let cutoff = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(prune_recovery(tmp.path(), Some(cutoff), false).unwrap(), 1);
        let left = read_recovery_entries(tmp.path(), None);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].category, RecoveryCategory::Delete);
    }

    #[test]
    fn test_prune_all_keeps_header() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry_at("2026-01-01T00:00:00Z", RecoveryCategory::Save));
        assert_eq!(prune_recovery(tmp.path(), None, true).unwrap(), 1);
        let content = std::fs::read_to_string(recovery_log_path(tmp.path())).unwrap();
        assert_eq!(content, FILE_HEADER);
    }

    #[test]
    fn test_prune_without_log_is_zero() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(prune_recovery(tmp.path(), None, true).unwrap(), 0);
    }

    #[test]
    fn test_parse_entry_header() {
        let (ts, cat, desc) =
            parse_entry_header("2026-03-04T05:06:07Z [repair] repaired 2 record(s)").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-04T05:06:07+00:00");
        assert_eq!(cat, RecoveryCategory::Repair);
        assert_eq!(desc, "repaired 2 record(s)");
        assert!(parse_entry_header("not a header").is_none());
        assert!(parse_entry_header("2026-03-04T05:06:07Z [bogus] x").is_none());
    }

    #[test]
    fn test_entry_to_json_embeds_body() {
        let json = entry_at("2026-01-01T00:00:00Z", RecoveryCategory::Save).to_json();
        assert_eq!(json["category"], "save");
        assert_eq!(json["menu"], "main");
        assert_eq!(json["body"][0]["id"], "a");
    }
}
