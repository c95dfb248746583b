//! End-of-run reporting.
//!
//! The counts are what matter; the text layout is for humans and may change.
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::batch::{DocumentOutcome, RunStatistics};

/// Current schema version for JSON run reports.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Enrich,
    Plan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Statistics plus per-document outcomes for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub directory: PathBuf,
    pub statistics: RunStatistics,
    pub documents: Vec<DocumentReport>,
}

#[derive(Serialize)]
struct ReportFile<'a> {
    schema_version: u32,
    #[serde(flatten)]
    report: &'a RunReport,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.documents.iter().filter_map(|doc| match &doc.outcome {
            DocumentOutcome::Failed { reason } => Some((doc.name.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.documents
            .iter()
            .filter(|doc| doc.outcome == DocumentOutcome::Pending)
            .map(|doc| doc.name.as_str())
    }

    pub fn to_json(&self) -> Result<String> {
        let file = ReportFile {
            schema_version: REPORT_SCHEMA_VERSION,
            report: self,
        };
        serde_json::to_string_pretty(&file).context("serialize run report")
    }
}

/// Render the human-readable summary.
pub fn render_text(report: &RunReport) -> String {
    let stats = &report.statistics;
    let mut out = String::new();
    match report.mode {
        RunMode::Enrich => {
            out.push_str(&format!(
                "Batch complete: enriched {} of {} documents in {}.\n",
                stats.succeeded,
                stats.total,
                report.directory.display()
            ));
            out.push_str(&format!("  processed: {}\n", stats.succeeded));
        }
        RunMode::Plan => {
            let pending = report.pending().count();
            out.push_str(&format!(
                "Plan: {} of {} documents in {} would be rewritten.\n",
                pending,
                stats.total,
                report.directory.display()
            ));
            out.push_str(&format!("  pending:   {pending}\n"));
        }
    }
    out.push_str(&format!(
        "  skipped:   {} (excluded {}, already enriched {})\n",
        stats.skipped(),
        stats.skipped_excluded,
        stats.skipped_enriched
    ));
    out.push_str(&format!("  failed:    {}\n", stats.failed));

    if report.mode == RunMode::Plan {
        for name in report.pending() {
            out.push_str(&format!("  + {name}\n"));
        }
    }
    for (name, reason) in report.failures() {
        out.push_str(&format!("  ! {name}: {reason}\n"));
    }
    out
}

/// Write the JSON report to `path`.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = report.to_json()?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
