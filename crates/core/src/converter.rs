//! Conversion entry point.
//!
//! [`Converter`] runs the whole pipeline over one input tree: scan, transform
//! every document, process all images in one pass, rewrite image paths, copy
//! assets and clean up. The stages run strictly in [`Stage`] order; a stage
//! never starts before the previous one has finished for every item.
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_core::{ConvertConfig, Converter};
//!
//! let config = ConvertConfig::builder()
//!     .input_dir("legacy/Guide")
//!     .output_dir("site/docs/guide")
//!     .project_name("guide")
//!     .build();
//!
//! let report = Converter::new(config).run()?;
//! println!("{} documents, {} duplicate images removed", report.documents_converted, report.images.duplicates_removed);
//! # Ok::<(), folio_core::FolioError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::assets::{copy_assets, find_documents, remove_empty_dirs};
use crate::formatters::MarkdownConfig;
use crate::images::ImageStore;
use crate::paths::{IMAGE_EXTENSIONS, normalize_segment};
use crate::references::ReferenceIndex;
use crate::report::{ConversionReport, Diagnostics, Stage};
use crate::resolver::PathResolver;
use crate::rewrite::{RewriteStats, rewrite_document};
use crate::transform::DocumentTransformer;
use crate::validate::{ValidationReport, validate};
use crate::{FolioError, Result};

/// Configuration for a conversion run.
///
/// # Example
///
/// ```rust
/// use folio_core::ConvertConfig;
///
/// let config = ConvertConfig::builder()
///     .input_dir("docs-html/Guide")
///     .output_dir("site/docs/guide")
///     .copy_assets(false)
///     .build();
/// assert_eq!(config.project_name(), "guide");
/// ```
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Root of the HTML source tree.
    pub input_dir: PathBuf,

    /// Directory the Markdown tree is written to. Its name is the first
    /// segment of every generated document link.
    pub output_dir: PathBuf,

    /// Canonical image directory (default: `<output>/../../static/img/<project>`).
    pub static_dir: Option<PathBuf>,

    /// Project name used in image URLs (default: lowercased input directory name).
    pub project_name: Option<String>,

    pub markdown: MarkdownConfig,

    /// Extensions treated as images rather than assets (default: png, jpg, jpeg, gif, svg, webp).
    pub image_extensions: Vec<String>,

    /// Whether to copy non-HTML, non-image files (default: true).
    pub copy_assets: bool,

    /// Whether to delete canonical images not used by this run (default: true).
    pub remove_unreferenced: bool,

    /// Whether to write into an output directory that already has content (default: false).
    pub overwrite: bool,

    /// How many warnings and errors a summary should list (default: 10).
    pub max_reported: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            static_dir: None,
            project_name: None,
            markdown: MarkdownConfig::default(),
            image_extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            copy_assets: true,
            remove_unreferenced: true,
            overwrite: false,
            max_reported: 10,
        }
    }
}

impl ConvertConfig {
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder::new()
    }

    /// The explicit project name, else the normalized input directory name.
    pub fn project_name(&self) -> String {
        self.project_name
            .clone()
            .unwrap_or_else(|| default_project_name(&self.input_dir))
    }

    /// The explicit static directory, else `static/img/<project>` two levels above `output_dir`.
    pub fn static_dir_for(&self, output_dir: &Path, project_name: &str) -> PathBuf {
        if let Some(dir) = &self.static_dir {
            return dir.clone();
        }
        let site_root = output_dir
            .parent()
            .and_then(Path::parent)
            .or_else(|| output_dir.parent())
            .unwrap_or(output_dir);
        site_root.join("static").join("img").join(project_name)
    }
}

/// Builder for ConvertConfig.
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    pub fn new() -> Self {
        Self { config: ConvertConfig::default() }
    }

    pub fn input_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.input_dir = value.into();
        self
    }

    pub fn output_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.output_dir = value.into();
        self
    }

    pub fn static_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.static_dir = Some(value.into());
        self
    }

    pub fn project_name(mut self, value: impl Into<String>) -> Self {
        self.config.project_name = Some(value.into());
        self
    }

    /// Sets whether to emit TOML frontmatter.
    pub fn frontmatter(mut self, value: bool) -> Self {
        self.config.markdown.include_frontmatter = value;
        self
    }

    /// Sets whether to prepend the page title as a heading.
    pub fn title_heading(mut self, value: bool) -> Self {
        self.config.markdown.include_title_heading = value;
        self
    }

    pub fn image_extensions<I, S>(mut self, value: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.image_extensions = value.into_iter().map(Into::into).collect();
        self
    }

    pub fn copy_assets(mut self, value: bool) -> Self {
        self.config.copy_assets = value;
        self
    }

    pub fn remove_unreferenced(mut self, value: bool) -> Self {
        self.config.remove_unreferenced = value;
        self
    }

    pub fn overwrite(mut self, value: bool) -> Self {
        self.config.overwrite = value;
        self
    }

    pub fn max_reported(mut self, value: usize) -> Self {
        self.config.max_reported = value;
        self
    }

    pub fn build(self) -> ConvertConfig {
        self.config
    }
}

impl Default for ConvertConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub static_dir: PathBuf,
    pub project_name: String,
    /// Name of the output directory, used as the document URL prefix.
    pub output_root_name: String,
}

/// Runs a conversion.
pub struct Converter {
    config: ConvertConfig,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Resolve every directory of the run to an absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::InvalidInputRoot`] when the input is not an existing directory.
    pub fn layout(&self) -> Result<Layout> {
        let input_dir = fs::canonicalize(&self.config.input_dir)
            .ok()
            .filter(|dir| dir.is_dir())
            .ok_or_else(|| FolioError::InvalidInputRoot(self.config.input_dir.clone()))?;

        let output_dir = absolute(&self.config.output_dir)?;
        let project_name = self
            .config
            .project_name
            .clone()
            .unwrap_or_else(|| default_project_name(&input_dir));
        let static_dir = absolute(&self.config.static_dir_for(&output_dir, &project_name))?;
        let output_root_name = output_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Layout { input_dir, output_dir, static_dir, project_name, output_root_name })
    }

    /// Run the full pipeline.
    ///
    /// Per-document and per-image failures are collected in the report; only
    /// an unusable input root, an occupied output directory (without
    /// `overwrite`) or an input tree with no documents fail the run.
    pub fn run(&self) -> Result<ConversionReport> {
        let layout = self.layout()?;
        let _span = tracing::info_span!("convert", project = %layout.project_name).entered();

        if !self.config.overwrite && is_non_empty_dir(&layout.output_dir) {
            return Err(FolioError::OutputExists(layout.output_dir));
        }

        let mut report = ConversionReport::new(&layout.project_name);
        let mut diagnostics = Diagnostics::new();
        let resolver = PathResolver::new(&layout.input_dir, &layout.output_dir, &layout.project_name);

        let documents = find_documents(&layout.input_dir);
        report.documents_found = documents.len();
        if documents.is_empty() {
            return Err(FolioError::NoDocuments(layout.input_dir));
        }
        fs::create_dir_all(&layout.output_dir)?;
        report.stage = Stage::DocumentsScanned;
        tracing::info!(documents = documents.len(), "Scanned input tree");

        let mut index = ReferenceIndex::new();
        let written = self.transform_documents(&documents, &resolver, &mut index, &mut report, &mut diagnostics);
        report.stage = Stage::DocumentsTransformed;

        let mut store = ImageStore::new(&layout.static_dir, resolver.image_url_prefix());
        store.process_all(&index, &resolver, &mut diagnostics);
        report.images = store.stats();
        report.stage = Stage::ImagesProcessed;

        let rewrite = rewrite_all(&written, &store, &mut diagnostics);
        report.images_rewritten = rewrite.rewritten;
        report.unresolved_image_links = rewrite.unresolved;
        report.stage = Stage::PathsRewritten;

        if self.config.copy_assets {
            report.assets_copied = copy_assets(&resolver, &self.config.image_extensions, &mut diagnostics);
        }
        report.stage = Stage::AssetsCopied;

        if self.config.remove_unreferenced {
            report.images_removed = store.remove_unreferenced(&mut diagnostics);
        }
        report.directories_removed = remove_empty_dirs(&layout.output_dir) + remove_empty_dirs(&layout.static_dir);
        report.stage = Stage::Cleaned;

        let (warnings, errors) = diagnostics.into_parts();
        report.warnings = warnings;
        report.errors = errors;
        report.stage = Stage::Done;

        tracing::info!(
            converted = report.documents_converted,
            failed = report.documents_failed,
            unique_images = report.images.unique_images,
            duplicates = report.images.duplicates_removed,
            "Conversion complete"
        );
        Ok(report)
    }

    fn transform_documents(
        &self, documents: &[PathBuf], resolver: &PathResolver, index: &mut ReferenceIndex,
        report: &mut ConversionReport, diagnostics: &mut Diagnostics,
    ) -> Vec<PathBuf> {
        let _span = tracing::info_span!("transform_documents").entered();
        let transformer = DocumentTransformer::new(resolver).with_markdown_config(self.config.markdown.clone());
        let mut written = Vec::with_capacity(documents.len());

        for source in documents {
            match convert_one(&transformer, resolver, source, index) {
                Ok((target, warnings)) => {
                    for warning in warnings {
                        diagnostics.warn(warning);
                    }
                    report.documents_converted += 1;
                    written.push(target);
                }
                Err(e) => {
                    diagnostics.error(format!("Failed to convert {}: {}", source.display(), e));
                    report.documents_failed += 1;
                }
            }
        }
        written
    }

    /// Validate the output of a finished run.
    pub fn validate(&self) -> Result<ValidationReport> {
        let layout = self.layout()?;
        Ok(validate(&layout.output_dir, &layout.static_dir, &layout.output_root_name, &layout.project_name))
    }
}

/// Transform one document and write its Markdown. Returns the written path and link warnings.
fn convert_one(
    transformer: &DocumentTransformer<'_>, resolver: &PathResolver, source: &Path, index: &mut ReferenceIndex,
) -> Result<(PathBuf, Vec<String>)> {
    let target = resolver.output_path(source)?;
    let document = transformer.transform_file(source, index)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, &document.markdown)?;
    tracing::debug!(source = %source.display(), target = %target.display(), "Wrote document");
    Ok((target, document.warnings))
}

fn rewrite_all(written: &[PathBuf], store: &ImageStore, diagnostics: &mut Diagnostics) -> RewriteStats {
    let _span = tracing::info_span!("rewrite_paths", documents = written.len()).entered();
    let mut total = RewriteStats::default();
    for path in written {
        match rewrite_document(path, store) {
            Ok(stats) => total += stats,
            Err(e) => diagnostics.warn(format!("Error updating image paths in {}: {}", path.display(), e)),
        }
    }
    total
}

fn default_project_name(input_dir: &Path) -> String {
    input_dir
        .file_name()
        .map(|name| normalize_segment(&name.to_string_lossy()))
        .unwrap_or_default()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).map(|mut entries| entries.next().is_some()).unwrap_or(false)
}
