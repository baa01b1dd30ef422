//! Plain file copying and output-tree cleanup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

use crate::paths::{has_extension, is_html_file};
use crate::report::Diagnostics;
use crate::resolver::PathResolver;

/// Copy a file and carry over its modification time where the platform allows.
pub fn copy_preserving_mtime(source: &Path, target: &Path) -> io::Result<()> {
    fs::copy(source, target)?;
    let metadata = fs::metadata(source)?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    if let Err(e) = filetime::set_file_mtime(target, mtime) {
        tracing::debug!(target = %target.display(), error = %e, "Could not preserve modification time");
    }
    Ok(())
}

/// Every HTML document under `root`, sorted by path.
pub fn find_documents(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_html_file(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// Copy every file that is neither a document nor an image into the output tree.
///
/// Assets land at the same normalized, duplicate-collapsed location a
/// document in their place would. Returns the number of files copied.
pub fn copy_assets<S: AsRef<str>>(
    resolver: &PathResolver, image_extensions: &[S], diagnostics: &mut Diagnostics,
) -> usize {
    let _span = tracing::info_span!("copy_assets").entered();
    let mut copied = 0;

    let assets = WalkDir::new(resolver.input_dir())
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_html_file(e.path()) && !has_extension(e.path(), image_extensions));

    for entry in assets {
        let source = entry.path();
        let target = match resolver.asset_output_path(source) {
            Ok(target) => target,
            Err(e) => {
                diagnostics.warn(e.to_string());
                continue;
            }
        };

        let result = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| copy_preserving_mtime(source, &target));

        match result {
            Ok(()) => {
                tracing::debug!(source = %source.display(), target = %target.display(), "Copied asset");
                copied += 1;
            }
            Err(e) => diagnostics.warn(format!("Error copying file {}: {}", source.display(), e)),
        }
    }

    copied
}

/// Remove empty directories below `root`, deepest first. `root` itself is kept.
///
/// Returns the number of directories removed.
pub fn remove_empty_dirs(root: &Path) -> usize {
    if !root.is_dir() {
        return 0;
    }

    let dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();

    let mut removed = 0;
    for dir in dirs {
        // Fails on non-empty directories, which is the point.
        if fs::remove_dir(&dir).is_ok() {
            tracing::debug!(path = %dir.display(), "Removed empty directory");
            removed += 1;
        }
    }
    removed
}
