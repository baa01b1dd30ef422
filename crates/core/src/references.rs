//! Image reference collection.
//!
//! While documents are transformed, every local `<img src>` is recorded here
//! together with the documents that use it. The image store consumes the
//! finished index in one pass, so nothing is copied before every reference
//! across the tree is known.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::paths::is_remote_image;

/// One distinct image `src` and the documents that reference it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// The raw `src` as written in the source HTML.
    pub original_path: String,
    /// Referencing documents in the order they were scanned.
    pub documents: Vec<PathBuf>,
}

/// Insertion-ordered index from raw `src` to referencing documents.
///
/// Keys are compared byte for byte: `Logo.png` and `logo.png` are separate
/// entries, as are `a%20b.png` and `a b.png`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    entries: IndexMap<String, Vec<PathBuf>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `document` references `original_path`.
    ///
    /// Appends to the existing list for the key (no merging of repeated
    /// documents). Remote URLs are ignored and `false` is returned for them;
    /// callers are expected to filter those out beforehand.
    pub fn add_reference(&mut self, original_path: &str, document: &Path) -> bool {
        if original_path.is_empty() || is_remote_image(original_path) {
            return false;
        }
        self.entries
            .entry(original_path.to_string())
            .or_default()
            .push(document.to_path_buf());
        true
    }

    /// Documents referencing `original_path`, in scan order.
    pub fn documents(&self, original_path: &str) -> Option<&[PathBuf]> {
        self.entries.get(original_path).map(|docs| docs.as_slice())
    }

    /// Iterate references in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.entries.iter().map(|(src, docs)| (src.as_str(), docs.as_slice()))
    }

    /// Owned snapshot of every reference, in first-insertion order.
    pub fn references(&self) -> Vec<ImageReference> {
        self.iter()
            .map(|(src, docs)| ImageReference { original_path: src.to_string(), documents: docs.to_vec() })
            .collect()
    }

    /// Number of distinct `src` keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
