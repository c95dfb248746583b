//! CLI argument parsing for the enrichment batch and its reporting helpers.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "denrich",
    version,
    about = "LM-driven batch enrichment for Markdown documentation",
    after_help = "Commands:\n  enrich --dir <dir>                           Rewrite eligible documents in place\n  plan --dir <dir>                             Classify documents without calling the LM\n  nav --docs-root <dir> --out <file>           Generate mkdocs.yml navigation\n  audit --source-root <dir> --docs-dir <dir>   List source files without documentation\n\nExamples:\n  OPENAI_API_KEY=sk-... denrich enrich --dir Documents/API_References\n  denrich plan --dir Documents/API_References --json\n  denrich nav --docs-root Documents --out mkdocs.yml\n  denrich audit --source-root . --docs-dir Documents/API_References",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Emit debug-level logs (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Enrich(EnrichArgs),
    Plan(PlanArgs),
    Nav(NavArgs),
    Audit(AuditArgs),
}

/// Inputs shared by `enrich` and `plan`.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Directory of Markdown documents to enrich
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// JSON config file (directory, exclude, markers, model, ...)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Document name to skip; may be repeated
    #[arg(long, value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Emit the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Rewrite every eligible document through the LM, in place")]
pub struct EnrichArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Chat-completions endpoint URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Model identifier sent with each request
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Pause after each successful rewrite, in milliseconds
    #[arg(long, value_name = "MS")]
    pub pacing_ms: Option<u64>,

    /// File with system instructions replacing the built-in prompt
    #[arg(long, value_name = "FILE")]
    pub instructions: Option<PathBuf>,

    /// Append one JSON line per LM call to this file
    #[arg(long, value_name = "FILE")]
    pub journal: Option<PathBuf>,

    /// Also write the JSON run report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Show which documents a run would rewrite, without calling the LM")]
pub struct PlanArgs {
    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Generate mkdocs.yml navigation from the documentation tree")]
pub struct NavArgs {
    /// Documentation root containing Manuals/, Core_Modules/, API_References/
    #[arg(long, value_name = "DIR")]
    pub docs_root: PathBuf,

    /// Output path for the generated mkdocs.yml
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Replace the built-in site header
    #[arg(long, value_name = "FILE")]
    pub header: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "List source files that have no documentation page")]
pub struct AuditArgs {
    /// Source tree to scan for .cs files
    #[arg(long, value_name = "DIR")]
    pub source_root: PathBuf,

    /// Documentation directory to match against
    #[arg(long, value_name = "DIR")]
    pub docs_dir: PathBuf,

    /// Additional directory name to skip; may be repeated
    #[arg(long, value_name = "NAME")]
    pub exclude_dir: Vec<String>,
}

impl BatchArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            directory: self.dir.clone(),
            exclude: self.exclude.clone(),
            ..ConfigOverrides::default()
        }
    }
}

impl EnrichArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_url: self.api_url.clone(),
            model: self.model.clone(),
            pacing_delay_ms: self.pacing_ms,
            instructions_path: self.instructions.clone(),
            ..self.batch.overrides()
        }
    }
}
