use super::*;
use crate::config::{Credentials, ExclusionSet, PLACEHOLDER_API_KEY};
use crate::journal::{read_journal, JournalOutcome};
use crate::rewrite::{RewriteError, RewriteResult};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Rewrite service that replays canned results per document.
#[derive(Default)]
struct ScriptedService {
    results: BTreeMap<String, RewriteResult>,
    calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedService {
    fn with(mut self, document: &str, result: RewriteResult) -> Self {
        self.results.insert(document.to_string(), result);
        self
    }

    fn called(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl RewriteService for ScriptedService {
    fn rewrite(&self, request: &RewriteRequest<'_>, token: &str) -> RewriteResult {
        assert_eq!(token, "sk-test");
        self.calls
            .borrow_mut()
            .push((request.document.to_string(), request.content.to_string()));
        self.results
            .get(request.document)
            .cloned()
            .unwrap_or_else(|| Err(RewriteError::Transport("no script".to_string())))
    }
}

fn write_doc(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents.as_bytes()).expect("write doc");
}

fn read_doc(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).expect("read doc")
}

fn test_config(dir: &Path, exclude: &[&str]) -> BatchConfig {
    let mut config = BatchConfig::new(
        dir.to_path_buf(),
        Credentials::new(Some("sk-test".to_string())),
    );
    config.exclusions = exclude.iter().map(|name| name.to_string()).collect();
    config
}

fn run_recording(
    config: &BatchConfig,
    service: &dyn RewriteService,
) -> (Result<RunReport, BatchError>, Vec<Duration>) {
    let mut pauses = Vec::new();
    let result = run_with_pacer(config, service, None, &mut |delay| pauses.push(delay));
    (result, pauses)
}

#[test]
fn excluded_enriched_and_eligible_documents() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_doc(dir.path(), "A.md", "# A\n\nhand written");
    write_doc(dir.path(), "B.md", "# B\n\nLookup is O(1).");
    write_doc(dir.path(), "C.md", "# C\n\nplain text");
    let config = test_config(dir.path(), &["A.md"]);
    let service = ScriptedService::default().with("C.md", Ok("# Rewritten".to_string()));

    let (result, pauses) = run_recording(&config, &service);
    let report = result.expect("run batch");

    assert_eq!(read_doc(dir.path(), "A.md"), "# A\n\nhand written");
    assert_eq!(read_doc(dir.path(), "B.md"), "# B\n\nLookup is O(1).");
    assert_eq!(read_doc(dir.path(), "C.md"), "# Rewritten");
    assert_eq!(
        report.statistics,
        RunStatistics {
            total: 3,
            skipped_excluded: 1,
            skipped_enriched: 1,
            succeeded: 1,
            failed: 0,
        }
    );
    assert_eq!(service.called(), vec!["C.md".to_string()]);
    assert_eq!(
        service.calls.borrow()[0].1,
        "# C\n\nplain text",
        "original content is sent verbatim"
    );
    assert_eq!(pauses, vec![config.pacing_delay]);
}

#[test]
fn placeholder_credentials_touch_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_doc(dir.path(), "C.md", "plain text");
    let mut config = test_config(dir.path(), &[]);
    config.credentials = Credentials::new(Some(PLACEHOLDER_API_KEY.to_string()));
    let service = ScriptedService::default().with("C.md", Ok("# Rewritten".to_string()));

    let (result, pauses) = run_recording(&config, &service);

    assert!(matches!(result, Err(BatchError::MissingCredentials)));
    assert!(service.called().is_empty());
    assert!(pauses.is_empty());
    assert_eq!(read_doc(dir.path(), "C.md"), "plain text");
}

#[test]
fn missing_credentials_checked_before_directory() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = test_config(&dir.path().join("absent"), &[]);
    config.credentials = Credentials::new(None);
    let (result, _) = run_recording(&config, &ScriptedService::default());
    assert!(matches!(result, Err(BatchError::MissingCredentials)));
}

#[test]
fn failures_leave_documents_untouched_and_run_continues() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_doc(dir.path(), "A.md", "first");
    write_doc(dir.path(), "B.md", "second");
    write_doc(dir.path(), "C.md", "third");
    write_doc(dir.path(), "D.md", "fourth");
    let config = test_config(dir.path(), &[]);
    let service = ScriptedService::default()
        .with(
            "A.md",
            Err(RewriteError::Service {
                status: 429,
                message: "Rate limit reached".to_string(),
            }),
        )
        .with("B.md", Ok("# B enriched".to_string()))
        .with(
            "C.md",
            Err(RewriteError::MalformedResponse("response has no choices".to_string())),
        )
        .with("D.md", Ok("# D enriched".to_string()));

    let (result, pauses) = run_recording(&config, &service);
    let report = result.expect("run batch");

    assert_eq!(read_doc(dir.path(), "A.md"), "first");
    assert_eq!(read_doc(dir.path(), "B.md"), "# B enriched");
    assert_eq!(read_doc(dir.path(), "C.md"), "third");
    assert_eq!(read_doc(dir.path(), "D.md"), "# D enriched");
    assert_eq!(report.statistics.succeeded, 2);
    assert_eq!(report.statistics.failed, 2);
    assert_eq!(service.called().len(), 4);
    assert_eq!(pauses.len(), 2, "pacing only follows successful rewrites");

    let failures: Vec<(&str, &str)> = report.failures().collect();
    assert_eq!(
        failures,
        vec![
            ("A.md", "service error 429: Rate limit reached"),
            ("C.md", "malformed response: response has no choices"),
        ]
    );
}

#[test]
fn blank_rewrite_keeps_document_and_counts_as_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_doc(dir.path(), "C.md", "# C\n\nplain text");
    write_doc(dir.path(), "D.md", "# D\n\nplain text");
    let config = test_config(dir.path(), &[]);
    let service = ScriptedService::default()
        .with("C.md", Ok(String::new()))
        .with("D.md", Ok("\n  \n".to_string()));

    let (result, pauses) = run_recording(&config, &service);
    let report = result.expect("run batch");

    assert_eq!(read_doc(dir.path(), "C.md"), "# C\n\nplain text");
    assert_eq!(read_doc(dir.path(), "D.md"), "# D\n\nplain text");
    assert_eq!(report.statistics.succeeded, 0);
    assert_eq!(report.statistics.failed, 2);
    assert!(pauses.is_empty());
    assert!(report
        .failures()
        .all(|(_, reason)| reason.contains("empty content")));
}

#[test]
fn second_run_skips_output_carrying_a_marker() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_doc(dir.path(), "C.md", "plain text");
    let config = test_config(dir.path(), &[]);
    let enriched = "# C\n\n```mermaid\ngraph TD\n```\n\nCost: $O(1)$".to_string();
    let service = ScriptedService::default().with("C.md", Ok(enriched.clone()));

    let (first, _) = run_recording(&config, &service);
    assert_eq!(first.expect("first run").statistics.succeeded, 1);

    let (second, pauses) = run_recording(&config, &service);
    let second = second.expect("second run");
    assert_eq!(second.statistics.skipped_enriched, 1);
    assert_eq!(second.statistics.succeeded, 0);
    assert!(pauses.is_empty());
    assert_eq!(service.called().len(), 1);
    assert_eq!(read_doc(dir.path(), "C.md"), enriched);
}

#[test]
fn excluded_documents_are_not_read() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("Binary.md"), [0xff, 0xfe]).expect("write bytes");
    let config = test_config(dir.path(), &["Binary.md"]);

    let (result, _) = run_recording(&config, &ScriptedService::default());
    let report = result.expect("run batch");
    assert_eq!(report.statistics.skipped_excluded, 1);
    assert_eq!(report.statistics.failed, 0);
}

#[test]
fn unreadable_document_counts_as_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("Binary.md"), [0xff, 0xfe]).expect("write bytes");
    write_doc(dir.path(), "Text.md", "plain");
    let config = test_config(dir.path(), &[]);
    let service = ScriptedService::default().with("Text.md", Ok("# Text".to_string()));

    let (result, _) = run_recording(&config, &service);
    let report = result.expect("run batch");
    assert_eq!(report.statistics.failed, 1);
    assert_eq!(report.statistics.succeeded, 1);
    assert_eq!(service.called(), vec!["Text.md".to_string()]);
}

#[test]
fn missing_directory_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = test_config(&dir.path().join("absent"), &[]);
    let (result, _) = run_recording(&config, &ScriptedService::default());
    assert!(matches!(result, Err(BatchError::Store { .. })));
}

#[test]
fn zero_pacing_delay_never_pauses() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_doc(dir.path(), "C.md", "plain text");
    let mut config = test_config(dir.path(), &[]);
    config.pacing_delay = Duration::ZERO;
    let service = ScriptedService::default().with("C.md", Ok("# C".to_string()));

    let (result, pauses) = run_recording(&config, &service);
    assert_eq!(result.expect("run batch").statistics.succeeded, 1);
    assert!(pauses.is_empty());
}

#[test]
fn journal_records_each_call() {
    let dir = tempfile::tempdir().expect("temp dir");
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).expect("create docs");
    write_doc(&docs, "A.md", "first");
    write_doc(&docs, "B.md", "O(1) already");
    write_doc(&docs, "C.md", "third");
    let config = test_config(&docs, &[]);
    let service = ScriptedService::default()
        .with("A.md", Ok("# A enriched".to_string()))
        .with("C.md", Err(RewriteError::Transport("timed out".to_string())));

    let journal_path = dir.path().join("journal.jsonl");
    let mut journal = Journal::open(&journal_path).expect("open journal");
    let report = run_with_pacer(&config, &service, Some(&mut journal), &mut |_| {})
        .expect("run batch");
    assert_eq!(report.statistics.total, 3);

    let entries = read_journal(&journal_path).expect("read journal");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].document, "A.md");
    assert_eq!(entries[0].outcome, JournalOutcome::Succeeded);
    assert_eq!(entries[0].request_bytes, "first".len());
    assert_eq!(entries[0].response_bytes, Some("# A enriched".len()));
    assert_eq!(entries[1].document, "C.md");
    assert_eq!(entries[1].outcome, JournalOutcome::Failed);
    assert_eq!(entries[1].error.as_deref(), Some("transport error: timed out"));
}

#[test]
fn plan_classifies_without_calling_or_writing() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_doc(dir.path(), "A.md", "hand written");
    write_doc(dir.path(), "B.md", "has a Mermaid diagram");
    write_doc(dir.path(), "C.md", "plain text");
    let mut config = test_config(dir.path(), &["A.md"]);
    config.credentials = Credentials::default();

    let report = plan(&config).expect("plan");
    assert_eq!(report.mode, RunMode::Plan);
    assert_eq!(report.statistics.skipped_excluded, 1);
    assert_eq!(report.statistics.skipped_enriched, 1);
    assert_eq!(report.statistics.succeeded, 0);
    assert_eq!(report.pending().collect::<Vec<_>>(), vec!["C.md"]);
    assert_eq!(read_doc(dir.path(), "C.md"), "plain text");
}

#[test]
fn curated_exclusions_apply_by_default() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_doc(dir.path(), "EntityId_eng.md", "hand written");
    let config = BatchConfig::new(
        dir.path().to_path_buf(),
        Credentials::new(Some("sk-test".to_string())),
    );
    assert_eq!(config.exclusions, ExclusionSet::curated());

    let (result, _) = run_recording(&config, &ScriptedService::default());
    assert_eq!(result.expect("run batch").statistics.skipped_excluded, 1);
}
