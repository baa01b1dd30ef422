//! Mapping from the source tree to the output tree.
//!
//! Document identity is positional: where a document ends up, and how other
//! documents link to it, follows from its source path alone. [`PathResolver`]
//! owns that mapping so the transformer, the image store and the asset copier
//! all agree on normalized, duplicate-collapsed locations.

use std::path::{Path, PathBuf};

use crate::paths::{
    collapse_under_root, decode_target, image_file_name, is_external_url, is_special_link, lexical_normalize,
    normalize_path, normalize_segment, path_components, split_anchor, strip_query, swap_document_extension,
    to_url_path,
};
use crate::{FolioError, Result};

/// Outcome of resolving one `<a href>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    /// The href to emit.
    pub href: String,
    /// Set when the target escaped the input root and a literal fallback was used.
    pub warning: Option<String>,
}

impl ResolvedLink {
    fn unchanged(href: &str) -> Self {
        Self { href: href.to_string(), warning: None }
    }
}

/// Resolves source paths to output paths and root-relative URLs.
#[derive(Debug, Clone)]
pub struct PathResolver {
    input_dir: PathBuf,
    output_dir: PathBuf,
    root_name: String,
    output_root_name: String,
    image_url_prefix: String,
}

impl PathResolver {
    /// Both directories are expected to be absolute.
    pub fn new(input_dir: &Path, output_dir: &Path, project_name: &str) -> Self {
        let root_name = input_dir
            .file_name()
            .map(|name| normalize_segment(&name.to_string_lossy()))
            .unwrap_or_default();
        let output_root_name = output_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            input_dir: input_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            root_name,
            output_root_name,
            image_url_prefix: format!("/static/img/{}", project_name),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Name of the output directory, the first segment of every document URL.
    pub fn output_root_name(&self) -> &str {
        &self.output_root_name
    }

    /// URL prefix of the canonical image tree, e.g. `/static/img/guide`.
    pub fn image_url_prefix(&self) -> &str {
        &self.image_url_prefix
    }

    /// Normalized, duplicate-collapsed components of `file` relative to the input root.
    pub fn relative_parts(&self, file: &Path) -> Result<Vec<String>> {
        let relative = file.strip_prefix(&self.input_dir).map_err(|_| FolioError::OutsideRoot {
            path: file.to_path_buf(),
            root: self.input_dir.clone(),
        })?;
        Ok(self.collapse(relative))
    }

    fn collapse(&self, relative: &Path) -> Vec<String> {
        collapse_under_root(&self.root_name, path_components(&normalize_path(relative)))
    }

    /// Where the Markdown for `document` is written.
    pub fn output_path(&self, document: &Path) -> Result<PathBuf> {
        let parts = self.relative_parts(document)?;
        let relative: PathBuf = parts.iter().collect();
        Ok(self.output_dir.join(swap_document_extension(&relative)))
    }

    /// Where a plain asset is copied to. Same layout as documents, no extension swap.
    pub fn asset_output_path(&self, file: &Path) -> Result<PathBuf> {
        let parts = self.relative_parts(file)?;
        Ok(parts.iter().fold(self.output_dir.clone(), |acc, part| acc.join(part)))
    }

    /// Collapsed relative directory of `document`, used as the image subdirectory.
    ///
    /// Empty for documents at the tree root and for documents
    /// outside it. Their images go to the image store root.
    pub fn document_subdir(&self, document: &Path) -> Vec<String> {
        match self.relative_parts(document) {
            Ok(mut parts) => {
                parts.pop();
                parts
            }
            Err(_) => Vec::new(),
        }
    }

    /// Provisional image target written before canonical paths are known.
    pub fn placeholder_image_path(&self, src: &str) -> String {
        format!("{}/{}", self.image_url_prefix, image_file_name(src))
    }

    /// Resolve a document link to its final root-relative Markdown URL.
    ///
    /// External, mail, script and pure-anchor links are returned unchanged.
    /// A target outside the input root keeps its literal path and carries a warning.
    pub fn resolve_link(&self, current_file: &Path, href: &str) -> ResolvedLink {
        if href.is_empty() || is_external_url(href) || is_special_link(href) {
            return ResolvedLink::unchanged(href);
        }

        let decoded = decode_target(href);
        let (path_part, anchor) = split_anchor(&decoded);
        let path_part = strip_query(path_part);
        if path_part.is_empty() {
            return ResolvedLink::unchanged(href);
        }

        let absolute = match path_part.strip_prefix('/') {
            Some(from_root) => self.input_dir.join(from_root),
            None => current_file.parent().unwrap_or(self.input_dir.as_path()).join(path_part),
        };
        let absolute = lexical_normalize(&absolute);

        let (parts, warning) = match absolute.strip_prefix(&self.input_dir) {
            Ok(relative) => (self.collapse(relative), None),
            Err(_) => (
                path_components(&normalize_path(Path::new(path_part))),
                Some(format!(
                    "Link target {} in {} is outside input directory {}",
                    absolute.display(),
                    current_file.display(),
                    self.input_dir.display()
                )),
            ),
        };

        let document = swap_document_extension(Path::new(&to_url_path(&parts)));
        let href = format!(
            "/{}/{}{}",
            self.output_root_name,
            to_url_path(&path_components(&document)),
            anchor
        );
        ResolvedLink { href, warning }
    }
}
