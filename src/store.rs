//! Document store: a flat directory of Markdown files.
//!
//! Documents are only ever read and overwritten in place. Overwrites go through
//! a temp file in the same directory followed by a rename, so an interrupted
//! run leaves each document either fully old or fully new.
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Extension of the documents this store manages.
pub const DOCUMENT_EXTENSION: &str = "md";

/// A document discovered in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    /// File name, used as the stable document identifier.
    pub name: String,
    pub path: PathBuf,
}

/// List the Markdown documents directly inside `dir`, sorted by name.
pub fn list_documents(dir: &Path) -> Result<Vec<DocumentEntry>> {
    let entries = fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    let mut documents = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping document with non UTF-8 name");
            continue;
        };
        documents.push(DocumentEntry {
            name: name.to_string(),
            path,
        });
    }
    documents.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(documents)
}

/// Read a document as UTF-8 text.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("decode {} as UTF-8", path.display()))
}

/// Replace a document's content atomically, keeping its permissions.
pub fn overwrite_document(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("document {} has no parent directory", path.display()))?;
    let permissions = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();

    let mut staged =
        NamedTempFile::new_in(parent).with_context(|| format!("stage {}", path.display()))?;
    staged
        .write_all(content.as_bytes())
        .with_context(|| format!("write staged {}", path.display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("sync staged {}", path.display()))?;
    fs::set_permissions(staged.path(), permissions)
        .with_context(|| format!("set permissions for {}", path.display()))?;
    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("publish {}", path.display()))?;
    Ok(())
}
