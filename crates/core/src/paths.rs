//! Path normalization and link classification.
//!
//! Everything in here is a pure function. The same normalization and
//! duplicate-segment rules are used for document output paths, document
//! cross-links, image subdirectories and asset copies, so generated links
//! line up with the files that are actually written.
//!
//! # Example
//!
//! ```rust
//! use folio_core::paths::{collapse_duplicate_segments, normalize_segment};
//!
//! assert_eq!(normalize_segment("Getting Started.HTML"), "getting_started.html");
//!
//! let parts = vec!["Admin".to_string(), "admin".to_string(), "index.html".to_string()];
//! assert_eq!(collapse_duplicate_segments(parts), vec!["admin", "index.html"]);
//! ```

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

/// Extensions treated as HTML documents.
pub const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

/// Extensions treated as images by default.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// Regex fragment for an inline Markdown link destination. Backslash escapes
/// (`\(`, `\)`) are part of the destination, so `shot_\(1\).png` matches whole.
pub const MARKDOWN_DESTINATION: &str = r"(?:\\.|[^)\s\\])+";

/// Regex fragment for inline link text, which may itself be an image
/// (`[![Logo](/logo.png)](/home.md)`).
pub const MARKDOWN_LINK_TEXT: &str = r"(?:!\[[^\]]*\]\((?:\\.|[^)\s\\])+\)|[^\]])*";

/// Normalize a single path component.
///
/// Lowercases the stem and replaces spaces with underscores, and lowercases the
/// extension. Dotfiles (`.htaccess`) have no extension and are lowercased as a
/// whole.
pub fn normalize_segment(segment: &str) -> String {
    match segment.rsplit_once('.') {
        Some((name, ext)) if !segment.starts_with('.') => {
            format!("{}.{}", name.to_lowercase().replace(' ', "_"), ext.to_lowercase())
        }
        _ => segment.to_lowercase().replace(' ', "_"),
    }
}

/// Normalize every component of a path independently, preserving separators.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .map(|component| match component {
            Component::Normal(part) => PathBuf::from(normalize_segment(&part.to_string_lossy())),
            other => PathBuf::from(other.as_os_str()),
        })
        .collect()
}

/// Split a relative path into its normal components as owned strings.
///
/// `.` components are dropped; `..` and root markers are kept verbatim so a
/// malformed relative path is never silently repaired.
pub fn path_components(path: &Path) -> Vec<String> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Drop the first component when the first two are equal, ignoring case.
///
/// Only the leading pair is inspected: `a/a/a/x` becomes `a/a/x`, and a
/// repeat further down the path (`a/b/a/x`) is left alone. Lists with fewer
/// than two entries are returned unchanged.
pub fn collapse_duplicate_segments(mut parts: Vec<String>) -> Vec<String> {
    if parts.len() >= 2 && parts[0].to_lowercase() == parts[1].to_lowercase() {
        parts.remove(0);
    }
    parts
}

/// Collapse a path relative to the input root.
///
/// A leading component named like the input root itself is the repeated
/// product folder (`Docs/Docs/guide.html` under root `Docs`) and is dropped.
/// Otherwise the pairwise rule of [`collapse_duplicate_segments`] applies.
pub fn collapse_under_root(root_name: &str, mut parts: Vec<String>) -> Vec<String> {
    if parts.len() >= 2 && parts[0].to_lowercase() == root_name.to_lowercase() {
        parts.remove(0);
        return parts;
    }
    collapse_duplicate_segments(parts)
}

/// Resolve `.` and `..` components without touching the file system.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Returns true for URLs with a network or mail scheme.
pub fn is_external_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "mailto" | "ftp" | "tel"),
        Err(_) => false,
    }
}

/// Returns true for in-page anchors and non-navigational pseudo links.
pub fn is_special_link(url: &str) -> bool {
    url.starts_with('#') || url.starts_with("javascript:") || url.starts_with("data:")
}

/// Returns true for image sources that live on the network.
///
/// Remote images are never hashed, copied or rewritten.
pub fn is_remote_image(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

/// Split `path#anchor` into `("path", "#anchor")`.
pub fn split_anchor(target: &str) -> (&str, &str) {
    match target.find('#') {
        Some(idx) => (&target[..idx], &target[idx..]),
        None => (target, ""),
    }
}

/// Strip a `?query` or `#fragment` suffix from a reference.
pub fn strip_query(target: &str) -> &str {
    match target.find(['?', '#']) {
        Some(idx) => &target[..idx],
        None => target,
    }
}

/// Percent-decode a link target. Invalid UTF-8 is replaced lossily.
pub fn decode_target(target: &str) -> Cow<'_, str> {
    percent_decode_str(target).decode_utf8_lossy()
}

/// Build a Markdown anchor slug from link text.
///
/// Lowercases, turns spaces into hyphens, keeps only alphanumerics, hyphens
/// and underscores, collapses runs of hyphens and trims them from both ends.
pub fn slugify_anchor(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().to_lowercase().chars() {
        let c = if c == ' ' { '-' } else { c };
        if !(c.is_alphanumeric() || c == '-' || c == '_') {
            continue;
        }
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    slug.trim_matches('-').to_string()
}

/// The normalized bare filename of an image reference.
///
/// This is the key shared by placeholder paths and the filename index of the
/// image store: query and fragment are stripped, the rest is percent-decoded,
/// and the last path segment is normalized.
pub fn image_file_name(src: &str) -> String {
    let decoded = decode_target(strip_query(src));
    let name = decoded.rsplit(['/', '\\']).next().unwrap_or_default();
    normalize_segment(name)
}

/// The file name of a placeholder image URL, normalized but not decoded again.
///
/// Placeholders are built from already-decoded names, so a literal `%` in
/// them is part of the name.
pub fn placeholder_file_name(placeholder: &str) -> String {
    let name = strip_query(placeholder).rsplit(['/', '\\']).next().unwrap_or_default();
    normalize_segment(name)
}

/// Remove Markdown backslash escapes from a link destination.
pub fn unescape_destination(destination: &str) -> Cow<'_, str> {
    if !destination.contains('\\') {
        return Cow::Borrowed(destination);
    }
    let mut out = String::with_capacity(destination.len());
    let mut chars = destination.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) if next.is_ascii_punctuation() => out.push(next),
                Some(next) => {
                    out.push(c);
                    out.push(next);
                }
                None => out.push(c),
            },
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape the parentheses of a path for use as a Markdown link destination.
pub fn escape_destination(path: &str) -> String {
    path.replace('(', "\\(").replace(')', "\\)")
}

/// Swap a `.html`/`.htm` extension (any case) for `.md`.
pub fn swap_document_extension(path: &Path) -> PathBuf {
    if is_html_file(path) { path.with_extension("md") } else { path.to_path_buf() }
}

/// Case-insensitive check for an HTML document extension.
pub fn is_html_file(path: &Path) -> bool {
    has_extension(path, HTML_EXTENSIONS)
}

/// Case-insensitive check against a list of extensions.
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e.as_ref())))
        .unwrap_or(false)
}

/// Join path components with `/` regardless of platform.
pub fn to_url_path<S: AsRef<str>>(parts: &[S]) -> String {
    parts.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn owned(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case("Getting Started.HTML", "getting_started.html")]
    #[case("Logo.PNG", "logo.png")]
    #[case("My Folder", "my_folder")]
    #[case(".HTACCESS", ".htaccess")]
    #[case("archive.tar.GZ", "archive.tar.gz")]
    #[case("already_fine.md", "already_fine.md")]
    fn test_normalize_segment(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_segment(input), expected);
    }

    #[test]
    fn test_normalize_path_keeps_separators() {
        let normalized = normalize_path(Path::new("User Guide/Install Steps/Step One.HTM"));
        assert_eq!(normalized, PathBuf::from("user_guide/install_steps/step_one.htm"));
    }

    #[test]
    fn test_normalize_absolute_path() {
        let normalized = normalize_path(Path::new("/Docs/A B.html"));
        assert_eq!(normalized, PathBuf::from("/docs/a_b.html"));
    }

    #[test]
    fn test_collapse_adjacent_leading_duplicate() {
        let parts = owned(&["Docs", "docs", "guide.html"]);
        assert_eq!(collapse_duplicate_segments(parts), owned(&["docs", "guide.html"]));
    }

    #[test]
    fn test_collapse_ignores_non_adjacent_duplicate() {
        let parts = owned(&["docs", "setup", "docs", "x.html"]);
        assert_eq!(collapse_duplicate_segments(parts.clone()), parts);
    }

    #[test]
    fn test_collapse_only_once() {
        let parts = owned(&["a", "a", "a", "x.html"]);
        assert_eq!(collapse_duplicate_segments(parts), owned(&["a", "a", "x.html"]));
    }

    #[test]
    fn test_collapse_short_lists_unchanged() {
        assert!(collapse_duplicate_segments(Vec::new()).is_empty());
        assert_eq!(collapse_duplicate_segments(owned(&["only"])), owned(&["only"]));
    }

    #[test]
    fn test_collapse_under_root_drops_root_name() {
        let parts = owned(&["docs", "guide.html"]);
        assert_eq!(collapse_under_root("Docs", parts), owned(&["guide.html"]));
    }

    #[test]
    fn test_collapse_under_root_falls_back_to_pairwise() {
        let parts = owned(&["api", "API", "index.html"]);
        assert_eq!(collapse_under_root("docs", parts), owned(&["API", "index.html"]));
    }

    #[test]
    fn test_collapse_under_root_keeps_single_component() {
        assert_eq!(collapse_under_root("docs", owned(&["docs"])), owned(&["docs"]));
    }

    #[test]
    fn test_lexical_normalize() {
        assert_eq!(lexical_normalize(Path::new("/a/b/../c/./d.png")), PathBuf::from("/a/c/d.png"));
        assert_eq!(lexical_normalize(Path::new("../x")), PathBuf::from("../x"));
    }

    #[rstest]
    #[case("https://example.com/x.png", true)]
    #[case("http://example.com", true)]
    #[case("mailto:someone@example.com", true)]
    #[case("ftp://files.example.com/a", true)]
    #[case("tel:+15551234", true)]
    #[case("../guide.html", false)]
    #[case("/docs/guide.html", false)]
    #[case("C:/docs/guide.html", false)]
    #[case("", false)]
    fn test_is_external_url(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_external_url(url), expected);
    }

    #[test]
    fn test_is_special_link() {
        assert!(is_special_link("#top"));
        assert!(is_special_link("javascript:void(0)"));
        assert!(is_special_link("data:image/png;base64,AAAA"));
        assert!(!is_special_link("page.html#top"));
    }

    #[test]
    fn test_split_anchor() {
        assert_eq!(split_anchor("page.html#Section"), ("page.html", "#Section"));
        assert_eq!(split_anchor("page.html"), ("page.html", ""));
        assert_eq!(split_anchor("#only"), ("", "#only"));
    }

    #[rstest]
    #[case("Getting Started", "getting-started")]
    #[case("  What's New?  ", "whats-new")]
    #[case("A -- B", "a-b")]
    #[case("snake_case stays", "snake_case-stays")]
    #[case("**Bold** Heading", "bold-heading")]
    #[case("---", "")]
    fn test_slugify_anchor(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(slugify_anchor(text), expected);
    }

    #[test]
    fn test_image_file_name() {
        assert_eq!(image_file_name("../Images/Screen Shot.PNG"), "screen_shot.png");
        assert_eq!(image_file_name("img/My%20Logo.png?v=2"), "my_logo.png");
        assert_eq!(image_file_name("logo.png"), "logo.png");
    }

    #[test]
    fn test_swap_document_extension() {
        assert_eq!(swap_document_extension(Path::new("a/b.HTML")), PathBuf::from("a/b.md"));
        assert_eq!(swap_document_extension(Path::new("a/b.htm")), PathBuf::from("a/b.md"));
        assert_eq!(swap_document_extension(Path::new("a/b.pdf")), PathBuf::from("a/b.pdf"));
    }

    #[test]
    fn test_has_extension_case_insensitive() {
        assert!(has_extension(Path::new("x.JPG"), IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("x.pdf"), IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("noext"), IMAGE_EXTENSIONS));
    }

    #[test]
    fn test_destination_escapes() {
        assert_eq!(unescape_destination(r"/img/shot_\(1\).png"), "/img/shot_(1).png");
        assert_eq!(unescape_destination(r"a\b.png"), r"a\b.png");
        assert!(matches!(unescape_destination("/img/plain.png"), Cow::Borrowed(_)));
        assert_eq!(escape_destination("/img/shot_(1).png"), r"/img/shot_\(1\).png");
    }

    #[test]
    fn test_placeholder_file_name_is_not_decoded_again() {
        assert_eq!(placeholder_file_name("/static/img/guide/a%41.png"), "a%41.png");
        assert_eq!(image_file_name("img/a%2541.png"), "a%41.png");
        assert_eq!(placeholder_file_name("/static/img/guide/Shot (1).PNG"), "shot_(1).png");
    }

    #[test]
    fn test_markdown_destination_pattern() {
        let re = regex::Regex::new(&format!(r"\(({})\)", MARKDOWN_DESTINATION)).unwrap();
        let caps = re.captures(r"![Shot](/img/shot_\(1\).png)").unwrap();
        assert_eq!(&caps[1], r"/img/shot_\(1\).png");
    }
}
