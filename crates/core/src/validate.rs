//! Post-run checks over the generated tree.
//!
//! Validation only reads: it checks naming conventions in the output and
//! image trees and that every local link and image target in the Markdown
//! exists where its URL says it does.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::paths::{
    MARKDOWN_DESTINATION, MARKDOWN_LINK_TEXT, is_external_url, is_special_link, split_anchor, unescape_destination,
};

static IMAGE_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"!\[[^\]]*\]\(({})", MARKDOWN_DESTINATION)).expect("image target pattern")
});

/// Links, including ones wrapped around an image. Group 1 is `!` for plain
/// images, which are checked separately.
static LINK_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(!?)\[{}\]\(({})", MARKDOWN_LINK_TEXT, MARKDOWN_DESTINATION)).expect("link target pattern")
});

/// Outcome of validating one output tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Markdown files inspected.
    pub files_checked: usize,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// What a validation run checks against.
#[derive(Debug, Clone)]
pub struct Validator {
    output_dir: PathBuf,
    static_dir: PathBuf,
    link_prefix: String,
    image_prefix: String,
}

impl Validator {
    pub fn new(output_dir: &Path, static_dir: &Path, output_root_name: &str, project_name: &str) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            static_dir: static_dir.to_path_buf(),
            link_prefix: format!("/{}/", output_root_name),
            image_prefix: format!("/static/img/{}/", project_name),
        }
    }

    pub fn run(&self) -> ValidationReport {
        let _span = tracing::info_span!("validate", output = %self.output_dir.display()).entered();
        let mut report = ValidationReport::default();

        check_names(&self.output_dir, "Output", &mut report.errors);
        if self.static_dir.is_dir() {
            check_names(&self.static_dir, "Static", &mut report.warnings);
        }

        for file in markdown_files(&self.output_dir) {
            report.files_checked += 1;
            match fs::read_to_string(&file) {
                Ok(content) => self.check_markdown(&file, &content, &mut report.errors),
                Err(e) => report.errors.push(format!("Cannot read file {}: {}", file.display(), e)),
            }
        }

        tracing::info!(
            files = report.files_checked,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Validation complete"
        );
        report
    }

    fn check_markdown(&self, file: &Path, content: &str, errors: &mut Vec<String>) {
        for (line_idx, line) in content.lines().enumerate() {
            let line_num = line_idx + 1;
            for caps in IMAGE_TARGET.captures_iter(line) {
                let target = unescape_destination(&caps[1]);
                if !is_external_url(&target) && !is_special_link(&target) {
                    self.check_image(file, line_num, &target, errors);
                }
            }
            for caps in LINK_TARGET.captures_iter(line) {
                let target = unescape_destination(&caps[2]);
                if &caps[1] != "!" && !is_external_url(&target) && !is_special_link(&target) {
                    self.check_link(file, line_num, &target, errors);
                }
            }
        }
    }

    fn check_link(&self, file: &Path, line_num: usize, target: &str, errors: &mut Vec<String>) {
        let (path, _) = split_anchor(target);
        let Some(relative) = path.strip_prefix(&self.link_prefix) else {
            errors.push(format!("Relative path found in {}:{} - {}", file.display(), line_num, target));
            return;
        };

        let resolved = self.output_dir.join(relative);
        if !resolved.exists() {
            errors.push(format!(
                "Broken link in {}:{} - {} (resolved to {})",
                file.display(),
                line_num,
                path,
                resolved.display()
            ));
        }
    }

    fn check_image(&self, file: &Path, line_num: usize, target: &str, errors: &mut Vec<String>) {
        let Some(relative) = target.strip_prefix(&self.image_prefix) else {
            errors.push(format!("Relative image path in {}:{} - {}", file.display(), line_num, target));
            return;
        };

        let resolved = self.static_dir.join(relative);
        if !resolved.is_file() {
            errors.push(format!(
                "Missing image in {}:{} - {} (resolved to {})",
                file.display(),
                line_num,
                target,
                resolved.display()
            ));
        }
    }
}

/// Validate a generated tree. See [`Validator`].
pub fn validate(output_dir: &Path, static_dir: &Path, output_root_name: &str, project_name: &str) -> ValidationReport {
    Validator::new(output_dir, static_dir, output_root_name, project_name).run()
}

fn markdown_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
        .map(|e| e.into_path())
        .collect()
}

/// Record every entry under `root` whose name has uppercase letters or spaces.
fn check_names(root: &Path, label: &str, out: &mut Vec<String>) {
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy();
        let kind = if entry.file_type().is_dir() { "directory" } else { "file" };
        if name != name.to_lowercase() {
            out.push(format!("{} {} not lowercase: {}", label, kind, entry.path().display()));
        }
        if name.contains(' ') {
            out.push(format!("{} {} contains spaces: {}", label, kind, entry.path().display()));
        }
    }
}
