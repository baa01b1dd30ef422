//! Error types for Folio operations.
//!
//! This module defines the main error type [`FolioError`]. Only a handful of
//! conditions are fatal for a conversion run (an unusable input root, an empty
//! tree); everything that goes wrong with a single document or image is caught
//! at the item boundary and recorded as a warning instead.
//!
//! # Example
//!
//! ```rust
//! use folio_core::{FolioError, Result};
//!
//! fn require_documents(found: usize, root: &std::path::Path) -> Result<()> {
//!     if found == 0 {
//!         return Err(FolioError::NoDocuments(root.to_path_buf()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for conversion operations.
#[derive(Error, Debug)]
pub enum FolioError {
    /// File system errors.
    ///
    /// Wraps standard I/O errors for reads, writes, copies and directory walks.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The input root does not exist or is not a directory.
    #[error("Input directory is not a readable directory: {0}")]
    InvalidInputRoot(PathBuf),

    /// A path escapes the declared input root.
    ///
    /// Returned when computing an output location for a file that does not
    /// live under the input directory.
    #[error("Path {path} is outside input directory {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// HTML parsing errors.
    ///
    /// Returned when HTML cannot be parsed or rewritten, often due to
    /// invalid CSS selectors.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Invalid character encoding.
    ///
    /// Returned when a document is not valid UTF-8.
    #[error("Invalid character encoding in {0}")]
    InvalidEncoding(PathBuf),

    /// The input tree contains no HTML documents.
    #[error("No HTML files found under {0}")]
    NoDocuments(PathBuf),

    /// The output directory already exists and overwriting was not requested.
    #[error("Output directory already exists: {0}")]
    OutputExists(PathBuf),

    /// Report serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for FolioError.
pub type Result<T> = std::result::Result<T, FolioError>;
