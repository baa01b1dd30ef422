//! Second pass over written Markdown: swap image placeholders for canonical paths.
//!
//! Runs after the image store has processed every reference. Each image link
//! is looked up by the filename portion of its target; targets that are
//! remote, or already canonical for this run, are left untouched, so running
//! the pass twice changes nothing.
//!
//! The lookup is by file name only. When unrelated images in different
//! sections share a name (`image1.png` in every chapter), every placeholder
//! with that name points at the first one stored; the image store records a
//! warning for each such name.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::Result;
use crate::images::ImageStore;
use crate::paths::{MARKDOWN_DESTINATION, escape_destination, is_external_url, is_special_link, unescape_destination};

static IMAGE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"!\[([^\]]*)\]\(({})((?:\s+"[^"]*")?)\)"#, MARKDOWN_DESTINATION))
        .expect("image link pattern")
});

/// Counters for one rewritten document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Image links whose target changed.
    pub rewritten: usize,
    /// Local image links with no canonical match; they keep their placeholder.
    pub unresolved: usize,
}

impl std::ops::AddAssign for RewriteStats {
    fn add_assign(&mut self, other: Self) {
        self.rewritten += other.rewritten;
        self.unresolved += other.unresolved;
    }
}

/// Rewrite every image link in `markdown` against `store`.
pub fn rewrite_image_paths(markdown: &str, store: &ImageStore) -> (String, RewriteStats) {
    let mut stats = RewriteStats::default();

    let rewritten = IMAGE_LINK.replace_all(markdown, |caps: &Captures| {
        let whole = caps[0].to_string();
        let placeholder = unescape_destination(&caps[2]);
        let placeholder = placeholder.as_ref();

        if is_external_url(placeholder) || is_special_link(placeholder) || store.is_canonical_url(placeholder) {
            return whole;
        }

        match store.resolve_placeholder(placeholder) {
            Some(canonical) if canonical != placeholder => {
                stats.rewritten += 1;
                format!("![{}]({}{})", &caps[1], escape_destination(&canonical), &caps[3])
            }
            Some(_) => whole,
            None => {
                tracing::debug!(placeholder, "No canonical image for placeholder");
                stats.unresolved += 1;
                whole
            }
        }
    });

    (rewritten.into_owned(), stats)
}

/// Rewrite one Markdown file in place. The file is only written when it changed.
pub fn rewrite_document(path: &Path, store: &ImageStore) -> Result<RewriteStats> {
    let content = fs::read_to_string(path)?;
    let (updated, stats) = rewrite_image_paths(&content, store);
    if updated != content {
        fs::write(path, updated)?;
    }
    Ok(stats)
}
