//! MkDocs navigation generation.
//!
//! Produces `mkdocs.yml` from a fixed site header followed by one nav section
//! per documentation subdirectory. Pure templating over directory listings.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::store::{list_documents, DOCUMENT_EXTENSION};
use crate::util::strip_extension;

/// Site header, theme, extensions and the fixed leading nav entries.
pub const MKDOCS_HEADER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/templates/mkdocs_header.yml"
));

/// A generated nav section backed by one subdirectory of the docs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavSection {
    pub title: String,
    pub subdir: String,
}

impl NavSection {
    pub fn new(title: &str, subdir: &str) -> Self {
        Self {
            title: title.to_string(),
            subdir: subdir.to_string(),
        }
    }
}

pub fn default_sections() -> Vec<NavSection> {
    vec![
        NavSection::new("Manuals (Kullanım Kılavuzları)", "Manuals"),
        NavSection::new("Core Modules", "Core_Modules"),
        NavSection::new("API References", "API_References"),
    ]
}

/// Render the full `mkdocs.yml` text.
///
/// A section whose directory does not exist is emitted with no entries.
pub fn render_nav(docs_root: &Path, header: &str, sections: &[NavSection]) -> Result<String> {
    let mut out = String::from(header);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for section in sections {
        out.push_str(&format!("  - \"{}\":\n", section.title));
        for (title, rel_path) in section_entries(docs_root, &section.subdir)? {
            out.push_str(&format!("      - \"{title}\": '{rel_path}'\n"));
        }
    }
    Ok(out)
}

/// Write rendered nav text to `out`.
pub fn write_nav(out: &Path, text: &str) -> Result<()> {
    fs::write(out, text.as_bytes()).with_context(|| format!("write {}", out.display()))
}

fn section_entries(docs_root: &Path, subdir: &str) -> Result<Vec<(String, String)>> {
    let dir = docs_root.join(subdir);
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "nav section directory missing");
        return Ok(Vec::new());
    }
    let suffix = format!(".{DOCUMENT_EXTENSION}");
    let entries = list_documents(&dir)?
        .into_iter()
        .filter_map(|doc| {
            let title = strip_extension(&doc.name, &suffix)?.to_string();
            let rel_path = format!("{}/{}", subdir.trim_end_matches('/'), doc.name);
            Some((title, rel_path))
        })
        .collect();
    Ok(entries)
}
