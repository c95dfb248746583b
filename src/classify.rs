//! Content classification for batch enrichment.
//!
//! Classification is recomputed from the document name and text on every run;
//! no enrichment state is stored on the side.
use crate::config::ExclusionSet;
use serde::Serialize;
use std::fmt;

/// Marker tokens treated as proof of a prior successful enrichment.
pub const DEFAULT_ENRICHMENT_MARKERS: [&str; 2] = ["Mermaid", "O(1)"];

/// Decision for a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Listed in the exclusion set; never sent to the rewrite service.
    Excluded,
    /// Content already carries an enrichment marker.
    AlreadyEnriched,
    /// Needs a rewrite.
    Eligible,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excluded => write!(f, "excluded"),
            Self::AlreadyEnriched => write!(f, "already_enriched"),
            Self::Eligible => write!(f, "eligible"),
        }
    }
}

/// Classify a document by name and current content.
///
/// The exclusion check is name-only and runs before the content is looked at.
/// Marker detection is plain substring containment, so a document that merely
/// mentions a marker token is treated as done.
pub fn classify<S: AsRef<str>>(
    name: &str,
    content: &str,
    exclusions: &ExclusionSet,
    markers: &[S],
) -> Classification {
    if exclusions.contains(name) {
        return Classification::Excluded;
    }
    if markers
        .iter()
        .map(AsRef::as_ref)
        .filter(|marker| !marker.is_empty())
        .any(|marker| content.contains(marker))
    {
        return Classification::AlreadyEnriched;
    }
    Classification::Eligible
}
