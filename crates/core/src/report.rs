//! Run diagnostics and the end-of-run report.

use std::fmt;

use serde::Serialize;

use crate::Result;

/// Pipeline stages, in the only order they can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    DocumentsScanned,
    DocumentsTransformed,
    ImagesProcessed,
    PathsRewritten,
    AssetsCopied,
    Cleaned,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::DocumentsScanned => "documents-scanned",
            Stage::DocumentsTransformed => "documents-transformed",
            Stage::ImagesProcessed => "images-processed",
            Stage::PathsRewritten => "paths-rewritten",
            Stage::AssetsCopied => "assets-copied",
            Stage::Cleaned => "cleaned",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Collects per-item failures so they never abort the run.
///
/// Every recorded message is also emitted as a `tracing` event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a recoverable problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Record a failed item (a document that could not be converted, say).
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.errors.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.warnings, self.errors)
    }
}

/// Image deduplication counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    /// Distinct image references that resolved to a file.
    pub total_references: usize,
    /// Distinct content hashes among them.
    pub unique_images: usize,
    pub duplicates_removed: usize,
    /// `duplicates_removed / total_references` as a percentage, e.g. `"40.0%"`.
    pub ratio: String,
}

impl DedupStats {
    pub fn new(total_references: usize, unique_images: usize) -> Self {
        let duplicates_removed = total_references.saturating_sub(unique_images);
        let ratio = if total_references > 0 {
            format!("{:.1}%", duplicates_removed as f64 / total_references as f64 * 100.0)
        } else {
            "0%".to_string()
        };
        Self { total_references, unique_images, duplicates_removed, ratio }
    }
}

impl Default for DedupStats {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Summary of one conversion run.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub project_name: String,
    pub documents_found: usize,
    pub documents_converted: usize,
    pub documents_failed: usize,
    pub images: DedupStats,
    /// Image links whose target changed during the rewrite pass.
    pub images_rewritten: usize,
    /// Image links still pointing at a placeholder after the rewrite pass.
    pub unresolved_image_links: usize,
    pub assets_copied: usize,
    pub images_removed: usize,
    pub directories_removed: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Last stage the run reached.
    pub stage: Stage,
}

impl ConversionReport {
    pub fn new(project_name: &str) -> Self {
        Self {
            project_name: project_name.to_string(),
            documents_found: 0,
            documents_converted: 0,
            documents_failed: 0,
            images: DedupStats::default(),
            images_rewritten: 0,
            unresolved_image_links: 0,
            assets_copied: 0,
            images_removed: 0,
            directories_removed: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
            stage: Stage::Init,
        }
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
