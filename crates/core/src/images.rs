//! Content-addressable image store.
//!
//! Runs once, after every document has been transformed and the
//! [`ReferenceIndex`] is complete. Each reference is resolved to a file on
//! disk and hashed with SHA-256; every distinct hash gets exactly one
//! canonical file under the store root, named after the (normalized) source
//! file, with `_1`, `_2`, ... appended when a different image already holds
//! the name.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use folio_core::images::ImageStore;
//! use folio_core::references::ReferenceIndex;
//! use folio_core::report::Diagnostics;
//! use folio_core::resolver::PathResolver;
//!
//! let resolver = PathResolver::new(Path::new("/src/guide"), Path::new("/site/docs/guide"), "guide");
//! let mut index = ReferenceIndex::new();
//! index.add_reference("images/logo.png", Path::new("/src/guide/index.html"));
//!
//! let mut store = ImageStore::new(Path::new("/site/static/img/guide"), resolver.image_url_prefix());
//! let mut diagnostics = Diagnostics::new();
//! store.process_all(&index, &resolver, &mut diagnostics);
//! println!("{:?}", store.resolve_by_original_path("images/logo.png"));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::assets::copy_preserving_mtime;
use crate::paths::{
    decode_target, image_file_name, lexical_normalize, normalize_segment, path_components, placeholder_file_name,
    strip_query, to_url_path,
};
use crate::references::ReferenceIndex;
use crate::report::{DedupStats, Diagnostics};
use crate::resolver::PathResolver;

/// SHA-256 digest of a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Hash a whole file, streaming it through the digest.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(Self(hasher.finalize().into()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// The single stored copy of one distinct image content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImage {
    pub hash: ContentHash,
    /// Path below the store root, `/`-separated.
    pub relative_path: String,
    /// The first source file seen with this content.
    pub source: PathBuf,
}

/// Where one original `src` ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResolution {
    pub hash: ContentHash,
    pub relative_path: String,
}

/// How a new hash got its canonical file.
enum Placement {
    Copied(String),
    Reused(String),
}

/// Deduplicating image store rooted at the canonical image directory.
#[derive(Debug)]
pub struct ImageStore {
    root: PathBuf,
    url_prefix: String,
    canonical: IndexMap<ContentHash, CanonicalImage>,
    resolutions: IndexMap<String, ImageResolution>,
    /// Normalized basename of each original `src` to the first canonical path
    /// it resolved to. Approximate: unrelated images sharing a basename map to
    /// whichever was seen first.
    by_filename: IndexMap<String, String>,
    canonical_urls: HashSet<String>,
    claimed: HashSet<PathBuf>,
    unresolved: Vec<String>,
}

impl ImageStore {
    /// `root` is the canonical image directory on disk; `url_prefix` is how
    /// Markdown refers to it (e.g. `/static/img/guide`).
    pub fn new(root: &Path, url_prefix: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            canonical: IndexMap::new(),
            resolutions: IndexMap::new(),
            by_filename: IndexMap::new(),
            canonical_urls: HashSet::new(),
            claimed: HashSet::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Resolve, hash, deduplicate and copy every referenced image.
    ///
    /// References are visited in first-insertion order. Missing files and
    /// I/O failures are recorded in `diagnostics` and leave the reference
    /// unresolved; nothing here aborts the run.
    pub fn process_all(&mut self, index: &ReferenceIndex, resolver: &PathResolver, diagnostics: &mut Diagnostics) {
        let _span = tracing::info_span!("process_images", references = index.len()).entered();

        if let Err(e) = fs::create_dir_all(&self.root) {
            diagnostics.warn(format!("Cannot create image directory {}: {}", self.root.display(), e));
        }

        for (original_path, documents) in index.iter() {
            if self.resolutions.contains_key(original_path) {
                continue;
            }
            self.process_reference(original_path, documents, resolver, diagnostics);
        }

        tracing::info!(
            resolved = self.resolutions.len(),
            unique = self.canonical.len(),
            unresolved = self.unresolved.len(),
            "Image processing complete"
        );
    }

    fn process_reference(
        &mut self, original_path: &str, documents: &[PathBuf], resolver: &PathResolver,
        diagnostics: &mut Diagnostics,
    ) {
        let Some((source, document)) = locate(original_path, documents, resolver.input_dir()) else {
            diagnostics.warn(format!("Image not found: {}", original_path));
            self.unresolved.push(original_path.to_string());
            return;
        };

        let hash = match ContentHash::of_file(&source) {
            Ok(hash) => hash,
            Err(e) => {
                diagnostics.warn(format!("Error hashing file {}: {}", source.display(), e));
                self.unresolved.push(original_path.to_string());
                return;
            }
        };

        if let Some(existing) = self.canonical.get(&hash) {
            tracing::debug!(src = original_path, canonical = %existing.relative_path, "Duplicate image");
            let relative_path = existing.relative_path.clone();
            self.record(original_path, hash, relative_path, diagnostics);
            return;
        }

        let subdir = resolver.document_subdir(document);
        let relative_path = match self.place(hash, &source, &subdir, diagnostics) {
            Ok(Placement::Copied(relative_path)) => {
                tracing::debug!(source = %source.display(), target = %relative_path, "Copied image");
                relative_path
            }
            Ok(Placement::Reused(relative_path)) => {
                tracing::debug!(source = %source.display(), target = %relative_path, "Reused existing image");
                relative_path
            }
            Err(e) => {
                diagnostics.warn(format!("Error copying image {}: {}", source.display(), e));
                self.unresolved.push(original_path.to_string());
                return;
            }
        };

        self.claimed.insert(self.root.join(&relative_path));
        self.canonical_urls.insert(self.url_for(&relative_path));
        self.canonical
            .insert(hash, CanonicalImage { hash, relative_path: relative_path.clone(), source });
        self.record(original_path, hash, relative_path, diagnostics);
    }

    fn record(
        &mut self, original_path: &str, hash: ContentHash, relative_path: String, diagnostics: &mut Diagnostics,
    ) {
        let key = image_file_name(original_path);
        match self.by_filename.get(&key) {
            Some(first) if *first != relative_path => diagnostics.warn(format!(
                "Image name {} is shared by {} and {}; links by name use {}",
                key, first, relative_path, first
            )),
            Some(_) => {}
            None => {
                self.by_filename.insert(key, relative_path.clone());
            }
        }
        self.resolutions
            .insert(original_path.to_string(), ImageResolution { hash, relative_path });
    }

    /// Pick the canonical file name for a new hash and put the bytes there.
    ///
    /// The first free name wins: the normalized source name, then `stem_1.ext`,
    /// `stem_2.ext`, ... A file already holding identical bytes is reused
    /// instead of copied; a file holding anything else is never overwritten.
    fn place(
        &self, hash: ContentHash, source: &Path, subdir: &[String], diagnostics: &mut Diagnostics,
    ) -> io::Result<Placement> {
        let name = normalize_segment(&source.file_name().map(|n| n.to_string_lossy()).unwrap_or_default());
        let (stem, extension) = split_extension(&name);

        let mut counter = 0usize;
        loop {
            let candidate = match (counter, extension) {
                (0, _) => name.clone(),
                (n, Some(ext)) => format!("{}_{}.{}", stem, n, ext),
                (n, None) => format!("{}_{}", name, n),
            };
            let mut parts = subdir.to_vec();
            parts.push(candidate.clone());
            let relative_path = to_url_path(&parts);
            let target = self.root.join(&relative_path);

            if !target.exists() {
                if counter > 0 {
                    diagnostics.warn(format!("Filename conflict for {}, using {}", name, relative_path));
                }
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                copy_preserving_mtime(source, &target)?;
                return Ok(Placement::Copied(relative_path));
            }

            match ContentHash::of_file(&target) {
                Ok(existing) if existing == hash => {
                    if counter > 0 {
                        diagnostics.warn(format!("Filename conflict for {}, using {}", name, relative_path));
                    }
                    return Ok(Placement::Reused(relative_path));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(target = %target.display(), error = %e, "Treating unreadable file as taken"),
            }
            counter += 1;
        }
    }

    fn url_for(&self, relative_path: &str) -> String {
        format!("{}/{}", self.url_prefix, relative_path)
    }

    /// Canonical URL for an original `src`, if it was resolved.
    pub fn resolve_by_original_path(&self, original_path: &str) -> Option<String> {
        self.resolutions
            .get(original_path)
            .map(|resolution| self.url_for(&resolution.relative_path))
    }

    /// Canonical URL for a bare filename.
    ///
    /// The filename is normalized like placeholder names are. The exact
    /// filename index is consulted first; failing that, the store root is
    /// searched for the exact name and then for `_N`-suffixed variants.
    pub fn resolve_by_filename(&self, filename: &str) -> Option<String> {
        self.resolve_name(&image_file_name(filename))
    }

    /// Canonical URL for a placeholder written by the document transformer.
    ///
    /// Like [`resolve_by_filename`](Self::resolve_by_filename), except that the
    /// name is not percent-decoded: placeholders already carry decoded names.
    pub fn resolve_placeholder(&self, placeholder: &str) -> Option<String> {
        self.resolve_name(&placeholder_file_name(placeholder))
    }

    fn resolve_name(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        if let Some(relative_path) = self.by_filename.get(key) {
            return Some(self.url_for(relative_path));
        }
        self.search_root(key).map(|relative_path| self.url_for(&relative_path))
    }

    fn search_root(&self, key: &str) -> Option<String> {
        if !self.root.is_dir() {
            return None;
        }

        let files: Vec<PathBuf> = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();

        let file_name = |path: &PathBuf| path.file_name().map(|n| n.to_string_lossy().into_owned());
        let found = files
            .iter()
            .find(|path| file_name(path).as_deref() == Some(key))
            .or_else(|| {
                files
                    .iter()
                    .find(|path| file_name(path).is_some_and(|name| is_suffixed_variant(&name, key)))
            })?;

        let relative = found.strip_prefix(&self.root).ok()?;
        Some(to_url_path(&path_components(relative)))
    }

    /// True when `url` is a canonical image URL produced in this run.
    pub fn is_canonical_url(&self, url: &str) -> bool {
        self.canonical_urls.contains(url)
    }

    pub fn resolution(&self, original_path: &str) -> Option<&ImageResolution> {
        self.resolutions.get(original_path)
    }

    /// Canonical images in the order their hashes were first seen.
    pub fn canonical_images(&self) -> impl Iterator<Item = &CanonicalImage> {
        self.canonical.values()
    }

    /// Original `src` values that could not be resolved or copied.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn stats(&self) -> DedupStats {
        DedupStats::new(self.resolutions.len(), self.canonical.len())
    }

    /// Delete files under the store root that this run neither copied nor reused.
    ///
    /// Returns the number of files removed.
    pub fn remove_unreferenced(&self, diagnostics: &mut Diagnostics) -> usize {
        if !self.root.is_dir() {
            return 0;
        }

        let stale: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| !self.claimed.contains(path))
            .collect();

        let mut removed = 0;
        for path in stale {
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Removed unreferenced image");
                    removed += 1;
                }
                Err(e) => diagnostics.warn(format!("Error removing image {}: {}", path.display(), e)),
            }
        }
        removed
    }
}

/// Find the source file for `original_path`, trying each referencing
/// document's directory in turn. Returns the file and the document it was
/// resolved from.
fn locate<'a>(original_path: &str, documents: &'a [PathBuf], input_dir: &Path) -> Option<(PathBuf, &'a Path)> {
    let raw = strip_query(original_path);
    let decoded = decode_target(raw);
    let mut variants = vec![raw];
    if decoded != raw {
        variants.push(&*decoded);
    }

    for document in documents {
        let base = document.parent().unwrap_or(input_dir);
        for variant in &variants {
            let candidate = match variant.strip_prefix('/') {
                Some(from_root) => input_dir.join(from_root),
                None => base.join(variant),
            };
            let candidate = lexical_normalize(&candidate);
            if candidate.is_file() {
                return Some((candidate, document.as_path()));
            }
        }
    }
    None
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// `logo_3.png` is a suffixed variant of `logo.png`.
fn is_suffixed_variant(name: &str, key: &str) -> bool {
    let (key_stem, key_ext) = split_extension(key);
    let (stem, ext) = split_extension(name);
    if ext != key_ext {
        return false;
    }
    match stem.strip_prefix(key_stem).and_then(|rest| rest.strip_prefix('_')) {
        Some(counter) => !counter.is_empty() && counter.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}
