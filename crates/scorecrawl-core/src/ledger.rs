//! Resume ledger: prior download outcomes keyed by (post id, link index).
//!
//! One JSON record per line, append-only. Every run appends a record per
//! processed link (skips included), so one key accumulates a record per
//! run; loading keeps the newest. Loaded whole at start-up to drive the
//! skip/overwrite decision.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Ledger key: one entry per link of a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResumeKey {
    pub post_id: String,
    pub link_index: usize,
}

/// Outcome of a prior (or just-finished) download of one link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub post_id: String,
    /// Final artifact location: the raw directory, or its `.zip` sibling.
    pub save_location: PathBuf,
    pub link_index: usize,
    pub url: String,
    pub downloaded_at: DateTime<Utc>,
    /// When true, a later run replaces this artifact instead of skipping.
    pub overwrite: bool,
}

impl ResumeRecord {
    pub fn key(&self) -> ResumeKey {
        ResumeKey {
            post_id: self.post_id.clone(),
            link_index: self.link_index,
        }
    }
}

/// Loads the ledger into a keyed map. A missing file is an empty ledger.
/// Keys repeat across runs in the append-only log; the last record for a
/// key wins.
pub fn load(path: &Path) -> Result<HashMap<ResumeKey, ResumeRecord>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ledger {}", path.display()))?;

    let mut map = HashMap::new();
    for (lineno, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: ResumeRecord = serde_json::from_str(line).with_context(|| {
            format!("bad ledger record at {}:{}", path.display(), lineno + 1)
        })?;
        map.insert(record.key(), record);
    }
    Ok(map)
}

/// Appends a batch of records to the ledger file, creating it if needed.
pub fn append_all(path: &Path, records: &[ResumeRecord]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open ledger {}", path.display()))?;

    for record in records {
        serde_json::to_writer(&mut file, record)?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(post_id: &str, link_index: usize) -> ResumeRecord {
        ResumeRecord {
            post_id: post_id.to_string(),
            save_location: PathBuf::from(format!("downloads/{post_id}-{link_index}")),
            link_index,
            url: format!("https://example.com/{post_id}/{link_index}"),
            downloaded_at: Utc::now(),
            overwrite: false,
        }
    }

    #[test]
    fn missing_file_is_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let map = load(&dir.path().join("none.jsonl")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn append_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        append_all(&path, &[record("aaa", 0), record("aaa", 1)]).unwrap();
        append_all(&path, &[record("bbb", 0)]).unwrap();

        let map = load(&path).unwrap();
        assert_eq!(map.len(), 3);
        let got = &map[&ResumeKey {
            post_id: "aaa".to_string(),
            link_index: 1,
        }];
        assert_eq!(got.url, "https://example.com/aaa/1");
    }

    #[test]
    fn later_record_for_same_key_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let mut first = record("aaa", 0);
        first.save_location = PathBuf::from("downloads/first-run");
        let mut second = record("aaa", 0);
        second.save_location = PathBuf::from("downloads/second-run");
        append_all(&path, &[first]).unwrap();
        append_all(&path, &[second]).unwrap();

        let map = load(&path).unwrap();
        assert_eq!(map.len(), 1);
        let got = &map[&ResumeKey {
            post_id: "aaa".to_string(),
            link_index: 0,
        }];
        assert_eq!(got.save_location, PathBuf::from("downloads/second-run"));
    }

    #[test]
    fn bad_line_reports_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        let err = load(&path).unwrap_err();
        assert!(format!("{err:#}").contains(":1"));
    }
}
