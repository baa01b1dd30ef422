//! Convert a tree of HTML documentation into Markdown.
//!
//! Documents are converted one by one while every local image reference is
//! collected. Images are then resolved, hashed and stored once per distinct
//! content, and a second pass points the Markdown at the canonical copies.
//! Paths are lowercased, spaces become underscores, and a repeated leading
//! folder (`Docs/Docs/..`) is collapsed.
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_core::{ConvertConfig, Converter};
//!
//! let config = ConvertConfig::builder()
//!     .input_dir("export/Guide")
//!     .output_dir("site/docs/guide")
//!     .build();
//! let converter = Converter::new(config);
//! let report = converter.run()?;
//! println!("dedup ratio: {}", report.images.ratio);
//!
//! let validation = converter.validate()?;
//! assert!(validation.passed());
//! # Ok::<(), folio_core::FolioError>(())
//! ```

pub mod assets;
pub mod converter;
pub mod error;
pub mod formatters;
pub mod images;
pub mod metadata;
pub mod parse;
pub mod paths;
pub mod postprocess;
pub mod preprocess;
pub mod references;
pub mod report;
pub mod resolver;
pub mod rewrite;
pub mod transform;
pub mod validate;

pub use converter::{ConvertConfig, ConvertConfigBuilder, Converter, Layout};
pub use error::{FolioError, Result};
pub use formatters::{MarkdownConfig, convert_to_markdown};
pub use images::{CanonicalImage, ContentHash, ImageResolution, ImageStore};
pub use metadata::Metadata;
pub use parse::Document;
#[doc(hidden)]
pub use postprocess::PostProcessConfig;
pub use postprocess::postprocess_markdown;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use preprocess::preprocess_html;
pub use references::{ImageReference, ReferenceIndex};
pub use report::{ConversionReport, DedupStats, Diagnostics, Stage};
pub use resolver::{PathResolver, ResolvedLink};
pub use rewrite::{RewriteStats, rewrite_document, rewrite_image_paths};
pub use transform::{DocumentTransformer, TransformedDocument};
pub use validate::{ValidationReport, Validator, validate};
