use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use tracing_subscriber::EnvFilter;

mod audit;
mod batch;
mod classify;
mod cli;
mod config;
mod journal;
mod nav;
mod report;
mod rewrite;
mod store;
mod util;

use batch::BatchError;
use cli::{AuditArgs, BatchArgs, Command, EnrichArgs, NavArgs, PlanArgs, RootArgs};
use config::{Credentials, FileConfig};
use journal::Journal;
use report::RunReport;
use rewrite::ChatCompletionsClient;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Enrich(args) => cmd_enrich(&args),
        Command::Plan(args) => cmd_plan(&args),
        Command::Nav(args) => cmd_nav(&args),
        Command::Audit(args) => cmd_audit(&args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_enrich(args: &EnrichArgs) -> Result<()> {
    let file = load_file_config(&args.batch)?;
    let key_env = config::api_key_env(&file).to_string();
    let credentials = Credentials::new(std::env::var(&key_env).ok());
    let config = config::resolve_config(&file, &args.overrides(), credentials)?;

    if config.credentials.bearer_token().is_none() {
        return Err(missing_key_error(&key_env));
    }

    let client = ChatCompletionsClient::new(&config.service);
    let mut journal = args
        .journal
        .as_deref()
        .map(Journal::open)
        .transpose()?;

    let report = match batch::run(&config, &client, journal.as_mut()) {
        Ok(report) => report,
        Err(BatchError::MissingCredentials) => return Err(missing_key_error(&key_env)),
        Err(err) => return Err(err.into()),
    };

    if let Some(path) = &args.report {
        report::write_report(path, &report)?;
    }
    emit_report(&report, args.batch.json)
}

fn missing_key_error(key_env: &str) -> anyhow::Error {
    anyhow!(
        "no API key configured: set {key_env} to a real key (the placeholder {} is not accepted)",
        config::PLACEHOLDER_API_KEY
    )
}

fn cmd_plan(args: &PlanArgs) -> Result<()> {
    let file = load_file_config(&args.batch)?;
    let config = config::resolve_config(&file, &args.batch.overrides(), Credentials::default())?;
    let report = batch::plan(&config)?;
    emit_report(&report, args.batch.json)
}

fn cmd_nav(args: &NavArgs) -> Result<()> {
    let header = match &args.header {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => nav::MKDOCS_HEADER.to_string(),
    };
    let text = nav::render_nav(&args.docs_root, &header, &nav::default_sections())?;
    nav::write_nav(&args.out, &text)?;
    println!("Wrote navigation to {}", args.out.display());
    Ok(())
}

fn cmd_audit(args: &AuditArgs) -> Result<()> {
    let mut options = audit::AuditOptions::default();
    options.excluded_dirs.extend(args.exclude_dir.iter().cloned());
    let missing = audit::undocumented(&args.source_root, &args.docs_dir, &options)?;
    tracing::info!(undocumented = missing.len(), "audit complete");
    for stem in missing {
        println!("{stem}");
    }
    Ok(())
}

fn load_file_config(args: &BatchArgs) -> Result<FileConfig> {
    match &args.config {
        Some(path) => config::load_file_config(path),
        None => Ok(FileConfig::default()),
    }
}

fn emit_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report::render_text(report));
    }
    Ok(())
}
