//! Batch orchestration for document enrichment.
//!
//! A run walks the document directory once, strictly in order: classify, then
//! (for eligible documents) one rewrite call, then an atomic overwrite and the
//! pacing delay. Per-document failures are counted and the run moves on; the
//! only fatal conditions are missing credentials and an unreadable directory,
//! both detected before any document is touched.
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crate::classify::{classify, Classification};
use crate::config::BatchConfig;
use crate::journal::{duration_ms, Journal, JournalEntry};
use crate::report::{DocumentReport, RunMode, RunReport};
use crate::rewrite::{RewriteError, RewriteRequest, RewriteService};
use crate::store::{self, DocumentEntry};

/// Fatal conditions that stop a run before any document is processed.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("API credentials are missing or still set to the placeholder value")]
    MissingCredentials,
    #[error("cannot list documents in {}: {reason}", path.display())]
    Store { path: PathBuf, reason: String },
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub total: usize,
    pub skipped_excluded: usize,
    pub skipped_enriched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunStatistics {
    pub fn skipped(&self) -> usize {
        self.skipped_excluded + self.skipped_enriched
    }
}

/// What happened to one document during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Excluded,
    AlreadyEnriched,
    /// Would be rewritten; only produced by [`plan`].
    Pending,
    Succeeded,
    Failed { reason: String },
}

/// Run the batch, sleeping the configured pacing delay after each success.
pub fn run(
    config: &BatchConfig,
    service: &dyn RewriteService,
    journal: Option<&mut Journal>,
) -> Result<RunReport, BatchError> {
    run_with_pacer(config, service, journal, &mut thread::sleep)
}

/// Run the batch with a caller-supplied pause function.
pub fn run_with_pacer(
    config: &BatchConfig,
    service: &dyn RewriteService,
    mut journal: Option<&mut Journal>,
    pacer: &mut dyn FnMut(Duration),
) -> Result<RunReport, BatchError> {
    let token = config
        .credentials
        .bearer_token()
        .ok_or(BatchError::MissingCredentials)?;
    let documents = enumerate(config)?;
    let total = documents.len();
    tracing::info!(
        total,
        exclusions = config.exclusions.names().count(),
        directory = %config.directory.display(),
        "starting enrichment batch"
    );

    let mut recorder = Recorder::new(RunMode::Enrich, config, total);
    for (idx, entry) in documents.iter().enumerate() {
        let position = idx + 1;
        let content = match inspect(config, entry) {
            Inspection::Skip(outcome) => {
                tracing::info!(position, total, document = %entry.name, ?outcome, "skipping");
                recorder.record(entry, outcome);
                continue;
            }
            Inspection::Unreadable(reason) => {
                tracing::warn!(position, total, document = %entry.name, %reason, "read failed");
                recorder.record(entry, DocumentOutcome::Failed { reason });
                continue;
            }
            Inspection::Eligible(content) => content,
        };

        tracing::info!(position, total, document = %entry.name, "rewriting");
        let request = RewriteRequest {
            document: &entry.name,
            content: &content,
            instructions: &config.instructions,
        };
        let start = Instant::now();
        let result = service.rewrite(&request, token).and_then(|rewritten| {
            if rewritten.trim().is_empty() {
                Err(RewriteError::MalformedResponse(
                    "service returned empty content".to_string(),
                ))
            } else {
                Ok(rewritten)
            }
        });
        let elapsed = start.elapsed();

        let outcome = match result {
            Ok(rewritten) => match store::overwrite_document(&entry.path, &rewritten) {
                Ok(()) => {
                    tracing::info!(
                        document = %entry.name,
                        elapsed_ms = duration_ms(elapsed),
                        response_bytes = rewritten.len(),
                        "document enriched"
                    );
                    journal_append(
                        journal.as_deref_mut(),
                        &JournalEntry::succeeded(
                            &entry.name,
                            elapsed,
                            content.len(),
                            rewritten.len(),
                        ),
                    );
                    DocumentOutcome::Succeeded
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    tracing::warn!(document = %entry.name, %reason, "write failed");
                    journal_append(
                        journal.as_deref_mut(),
                        &JournalEntry::failed(&entry.name, elapsed, content.len(), &reason),
                    );
                    DocumentOutcome::Failed { reason }
                }
            },
            Err(err) => {
                let reason = err.to_string();
                tracing::warn!(
                    document = %entry.name,
                    elapsed_ms = duration_ms(elapsed),
                    %reason,
                    "rewrite failed"
                );
                journal_append(
                    journal.as_deref_mut(),
                    &JournalEntry::failed(&entry.name, elapsed, content.len(), &reason),
                );
                DocumentOutcome::Failed { reason }
            }
        };

        let succeeded = outcome == DocumentOutcome::Succeeded;
        recorder.record(entry, outcome);
        if succeeded && !config.pacing_delay.is_zero() {
            pacer(config.pacing_delay);
        }
    }

    let report = recorder.finish();
    tracing::info!(
        succeeded = report.statistics.succeeded,
        skipped = report.statistics.skipped(),
        failed = report.statistics.failed,
        "enrichment batch complete"
    );
    Ok(report)
}

/// Classify every document without calling the service or writing anything.
pub fn plan(config: &BatchConfig) -> Result<RunReport, BatchError> {
    let documents = enumerate(config)?;
    let mut recorder = Recorder::new(RunMode::Plan, config, documents.len());
    for entry in &documents {
        let outcome = match inspect(config, entry) {
            Inspection::Skip(outcome) => outcome,
            Inspection::Unreadable(reason) => DocumentOutcome::Failed { reason },
            Inspection::Eligible(_) => DocumentOutcome::Pending,
        };
        tracing::debug!(document = %entry.name, ?outcome, "planned");
        recorder.record(entry, outcome);
    }
    Ok(recorder.finish())
}

enum Inspection {
    Skip(DocumentOutcome),
    Unreadable(String),
    Eligible(String),
}

fn enumerate(config: &BatchConfig) -> Result<Vec<DocumentEntry>, BatchError> {
    store::list_documents(&config.directory).map_err(|err| BatchError::Store {
        path: config.directory.clone(),
        reason: format!("{err:#}"),
    })
}

/// Decide what to do with a document. Excluded names are never read.
fn inspect(config: &BatchConfig, entry: &DocumentEntry) -> Inspection {
    if config.exclusions.contains(&entry.name) {
        return Inspection::Skip(DocumentOutcome::Excluded);
    }
    let content = match store::read_document(&entry.path) {
        Ok(content) => content,
        Err(err) => return Inspection::Unreadable(format!("{err:#}")),
    };
    match classify(&entry.name, &content, &config.exclusions, &config.markers) {
        Classification::Excluded => Inspection::Skip(DocumentOutcome::Excluded),
        Classification::AlreadyEnriched => Inspection::Skip(DocumentOutcome::AlreadyEnriched),
        Classification::Eligible => Inspection::Eligible(content),
    }
}

fn journal_append(journal: Option<&mut Journal>, entry: &JournalEntry) {
    let Some(journal) = journal else {
        return;
    };
    if let Err(err) = journal.append(entry) {
        tracing::warn!(error = %format!("{err:#}"), "journal append failed");
    }
}

struct Recorder {
    report: RunReport,
}

impl Recorder {
    fn new(mode: RunMode, config: &BatchConfig, total: usize) -> Self {
        Self {
            report: RunReport {
                mode,
                directory: config.directory.clone(),
                statistics: RunStatistics {
                    total,
                    ..RunStatistics::default()
                },
                documents: Vec::with_capacity(total),
            },
        }
    }

    fn record(&mut self, entry: &DocumentEntry, outcome: DocumentOutcome) {
        let stats = &mut self.report.statistics;
        match &outcome {
            DocumentOutcome::Excluded => stats.skipped_excluded += 1,
            DocumentOutcome::AlreadyEnriched => stats.skipped_enriched += 1,
            DocumentOutcome::Succeeded => stats.succeeded += 1,
            DocumentOutcome::Failed { .. } => stats.failed += 1,
            DocumentOutcome::Pending => {}
        }
        self.report.documents.push(DocumentReport {
            name: entry.name.clone(),
            outcome,
        });
    }

    fn finish(self) -> RunReport {
        self.report
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
