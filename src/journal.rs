//! Rewrite invocation journal.
//!
//! One JSON line per call to the generation service, appended as the batch
//! runs so an interrupted run still leaves a record of what it attempted.
//!
//! ```jsonl
//! {"schema_version":1,"ts":1707900000000,"document":"EntityQuery_eng.md","outcome":"succeeded","duration_ms":4200,"request_bytes":1834,"response_bytes":9120}
//! {"schema_version":1,"ts":1707900006000,"document":"World_tr.md","outcome":"failed","duration_ms":310,"request_bytes":912,"error":"service error 429: Rate limit reached"}
//! ```
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current schema version for journal entries.
pub const JOURNAL_SCHEMA_VERSION: u32 = 1;

/// Outcome of a single rewrite call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalOutcome {
    Succeeded,
    Failed,
}

/// A single journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub schema_version: u32,
    /// Unix timestamp in milliseconds when the call finished.
    pub ts: u64,
    pub document: String,
    pub outcome: JournalOutcome,
    pub duration_ms: u64,
    /// Size of the original document sent to the service.
    pub request_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub response_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl JournalEntry {
    pub fn succeeded(
        document: &str,
        duration: Duration,
        request_bytes: usize,
        response_bytes: usize,
    ) -> Self {
        Self {
            schema_version: JOURNAL_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            document: document.to_string(),
            outcome: JournalOutcome::Succeeded,
            duration_ms: duration_ms(duration),
            request_bytes,
            response_bytes: Some(response_bytes),
            error: None,
        }
    }

    pub fn failed(document: &str, duration: Duration, request_bytes: usize, error: &str) -> Self {
        Self {
            schema_version: JOURNAL_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            document: document.to_string(),
            outcome: JournalOutcome::Failed,
            duration_ms: duration_ms(duration),
            request_bytes,
            response_bytes: None,
            error: Some(error.to_string()),
        }
    }
}

/// Append-only JSONL journal.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    file: File,
}

impl Journal {
    /// Open (creating if needed) the journal at `path` for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn append(&mut self, entry: &JournalEntry) -> Result<()> {
        let line = serde_json::to_string(entry).context("serialize journal entry")?;
        self.file
            .write_all(line.as_bytes())
            .with_context(|| format!("write {}", self.path.display()))?;
        self.file
            .write_all(b"\n")
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}

/// Read every entry in a journal, skipping blank lines.
#[cfg(test)]
pub(crate) fn read_journal(path: &Path) -> Result<Vec<JournalEntry>> {
    use std::io::{BufRead, BufReader};

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: JournalEntry = serde_json::from_str(&line)
            .with_context(|| format!("parse {} line {}", path.display(), idx + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_ms)
        .unwrap_or(0)
}
