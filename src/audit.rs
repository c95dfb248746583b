//! Documentation coverage audit.
//!
//! Reports source files whose stem has no matching documentation file.
//! Documentation stems are normalized by dropping one language suffix, so
//! `World_eng.md` and `World_tr.md` both document `World.cs`.
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::util::strip_extension;

/// Knobs for matching source files against documentation files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditOptions {
    pub source_extension: String,
    pub doc_extension: String,
    /// Any path with one of these directory components is skipped.
    pub excluded_dirs: Vec<String>,
    /// Source file names that never need documentation.
    pub ignored_files: Vec<String>,
    pub language_suffixes: Vec<String>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            source_extension: ".cs".to_string(),
            doc_extension: ".md".to_string(),
            excluded_dirs: ["Plugins", "obj", "bin", "Nexus.Tests", "Nexus.UnityHelper.Tests"]
                .iter()
                .map(|dir| dir.to_string())
                .collect(),
            ignored_files: vec!["Class1.cs".to_string(), "Program.cs".to_string()],
            language_suffixes: vec!["_tr".to_string(), "_eng".to_string()],
        }
    }
}

/// Sorted source stems with no documentation counterpart.
pub fn undocumented(
    source_root: &Path,
    docs_dir: &Path,
    options: &AuditOptions,
) -> Result<Vec<String>> {
    let sources = source_stems(source_root, options)?;
    let docs = doc_stems(docs_dir, options)?;
    Ok(sources.difference(&docs).cloned().collect())
}

pub fn source_stems(source_root: &Path, options: &AuditOptions) -> Result<BTreeSet<String>> {
    let mut stems = BTreeSet::new();
    for path in collect_files(source_root)? {
        let rel = path.strip_prefix(source_root).unwrap_or(path.as_path());
        if in_excluded_dir(rel, &options.excluded_dirs) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if options.ignored_files.iter().any(|ignored| ignored == name) {
            continue;
        }
        if let Some(stem) = strip_extension(name, &options.source_extension) {
            stems.insert(stem.to_string());
        }
    }
    Ok(stems)
}

pub fn doc_stems(docs_dir: &Path, options: &AuditOptions) -> Result<BTreeSet<String>> {
    let mut stems = BTreeSet::new();
    for path in collect_files(docs_dir)? {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(stem) = strip_extension(name, &options.doc_extension) else {
            continue;
        };
        let stem = options
            .language_suffixes
            .iter()
            .find_map(|suffix| strip_extension(stem, suffix))
            .unwrap_or(stem);
        stems.insert(stem.to_string());
    }
    Ok(stems)
}

fn in_excluded_dir(rel: &Path, excluded: &[String]) -> bool {
    let Some(parent) = rel.parent() else {
        return false;
    };
    parent.components().any(|component| match component {
        Component::Normal(part) => part
            .to_str()
            .is_some_and(|part| excluded.iter().any(|dir| dir == part)),
        _ => false,
    })
}

fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", root.display()))?;
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_files(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
