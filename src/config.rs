//! Batch configuration.
//!
//! Everything a run needs is resolved once at startup into a [`BatchConfig`]
//! and passed down by reference. The core never reads environment variables or
//! other process-wide state; `main` does that and hands the values in here.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::DEFAULT_ENRICHMENT_MARKERS;

/// Credential value shipped in templates; treated as "not configured".
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";
/// Environment variable holding the bearer token unless overridden.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_PACING_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Hand-crafted documents that must never be rewritten.
pub const DEFAULT_EXCLUSIONS: [&str; 8] = [
    "EntityId_eng.md",
    "EntityId_tr.md",
    "EntityCommandBuffer_eng.md",
    "EntityCommandBuffer_tr.md",
    "ComponentTypeManager_eng.md",
    "ComponentTypeManager_tr.md",
    "ISparseSet_eng.md",
    "ISparseSet_tr.md",
];

const DEFAULT_INSTRUCTIONS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/rewrite_system.md"
));

/// Exact document names that are always skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    /// The curated list of hand-written documents.
    pub fn curated() -> Self {
        DEFAULT_EXCLUSIONS.iter().map(|name| name.to_string()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<String> for ExclusionSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Opaque bearer token for the generation service.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Return the token when it is present and not the placeholder.
    pub fn bearer_token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty() && *token != PLACEHOLDER_API_KEY)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.bearer_token().is_some() {
            "<redacted>"
        } else {
            "<unset>"
        };
        f.debug_struct("Credentials").field("token", &state).finish()
    }
}

/// Connection settings for the chat-completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        }
    }
}

/// Fully resolved settings for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory holding the Markdown documents to enrich.
    pub directory: PathBuf,
    pub exclusions: ExclusionSet,
    /// Tokens whose presence marks a document as already enriched.
    pub markers: Vec<String>,
    pub credentials: Credentials,
    pub service: ServiceConfig,
    /// System-role instructions sent with every rewrite.
    pub instructions: String,
    /// Pause after each successful rewrite.
    pub pacing_delay: Duration,
}

impl BatchConfig {
    /// Build a config with defaults for everything but the directory.
    pub fn new(directory: PathBuf, credentials: Credentials) -> Self {
        Self {
            directory,
            exclusions: ExclusionSet::curated(),
            markers: default_markers(),
            credentials,
            service: ServiceConfig::default(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            pacing_delay: Duration::from_millis(DEFAULT_PACING_DELAY_MS),
        }
    }
}

/// On-disk config file; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Replaces the curated exclusion list when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing_delay_ms: Option<u64>,
    /// Zero disables the request timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

/// Values supplied on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub directory: Option<PathBuf>,
    /// Added to whichever exclusion list the file config selects.
    pub exclude: Vec<String>,
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub pacing_delay_ms: Option<u64>,
    pub instructions_path: Option<PathBuf>,
}

pub fn default_markers() -> Vec<String> {
    DEFAULT_ENRICHMENT_MARKERS
        .iter()
        .map(|marker| marker.to_string())
        .collect()
}

/// Load a JSON config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: FileConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Name of the environment variable that carries the bearer token.
pub fn api_key_env(file: &FileConfig) -> &str {
    file.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
}

/// Merge file config, CLI overrides and credentials into a [`BatchConfig`].
pub fn resolve_config(
    file: &FileConfig,
    overrides: &ConfigOverrides,
    credentials: Credentials,
) -> Result<BatchConfig> {
    let directory = overrides
        .directory
        .clone()
        .or_else(|| file.directory.clone())
        .ok_or_else(|| anyhow!("no document directory given (use --dir or `directory` in config)"))?;

    let mut config = BatchConfig::new(directory, credentials);

    if let Some(exclude) = &file.exclude {
        config.exclusions = exclude.iter().cloned().collect();
    }
    config.exclusions.extend(overrides.exclude.iter().cloned());

    if let Some(markers) = &file.markers {
        config.markers = markers.clone();
    }

    if let Some(api_url) = overrides.api_url.as_ref().or(file.api_url.as_ref()) {
        config.service.api_url = api_url.clone();
    }
    if let Some(model) = overrides.model.as_ref().or(file.model.as_ref()) {
        config.service.model = model.clone();
    }
    if let Some(temperature) = file.temperature {
        config.service.temperature = temperature;
    }
    if let Some(secs) = file.request_timeout_secs {
        config.service.request_timeout = if secs == 0 {
            None
        } else {
            Some(Duration::from_secs(secs))
        };
    }
    if let Some(ms) = overrides.pacing_delay_ms.or(file.pacing_delay_ms) {
        config.pacing_delay = Duration::from_millis(ms);
    }

    let instructions_path = overrides
        .instructions_path
        .as_ref()
        .or(file.instructions_path.as_ref());
    if let Some(path) = instructions_path {
        config.instructions = fs::read_to_string(path)
            .with_context(|| format!("read instructions {}", path.display()))?;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Reject settings that would make every request fail.
pub fn validate_config(config: &BatchConfig) -> Result<()> {
    if config.service.api_url.trim().is_empty() {
        return Err(anyhow!("api_url must not be empty"));
    }
    if config.service.model.trim().is_empty() {
        return Err(anyhow!("model must not be empty"));
    }
    if !(0.0..=2.0).contains(&config.service.temperature) {
        return Err(anyhow!(
            "temperature {} is outside 0.0..=2.0",
            config.service.temperature
        ));
    }
    if config.instructions.trim().is_empty() {
        return Err(anyhow!("rewrite instructions are empty"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
