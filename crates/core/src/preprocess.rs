use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Document;

/// Selectors for page chrome removed when a document has no main-content region.
const CHROME_SELECTORS: &[&str] = &[
    "nav",
    "header",
    "footer",
    ".navigation",
    ".nav",
    ".header",
    ".footer",
    "#navigation",
    "#nav",
    "#header",
    "#footer",
];

/// Two or more `<br>` tags separated only by whitespace.
static BREAK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>(?:\s*<br\s*/?>)+").expect("break run pattern"));

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove script tags
    pub remove_scripts: bool,
    /// Whether to remove style tags
    pub remove_styles: bool,
    /// Whether to remove noscript tags
    pub remove_noscript: bool,
    /// Whether to remove HTML comments
    pub remove_comments: bool,
    /// Whether to remove `<head>` (metadata is read before preprocessing)
    pub remove_head: bool,
    /// Keep only `div[role="main"]` when the page has one
    pub extract_main: bool,
    /// Remove navigation, header and footer chrome when there is no main region
    pub remove_chrome: bool,
    /// Collapse runs of `<br>` into a single line break
    pub collapse_breaks: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_scripts: true,
            remove_styles: true,
            remove_noscript: true,
            remove_comments: true,
            remove_head: true,
            extract_main: true,
            remove_chrome: true,
            collapse_breaks: true,
        }
    }
}

/// Preprocess HTML down to the content worth converting.
///
/// When `extract_main` is set and the page has a `div[role="main"]`, only that
/// subtree survives. Otherwise the page is kept whole minus its chrome.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let (processed, has_main) = match config.extract_main.then(|| extract_main_content(html)).flatten() {
        Some(main) => (main, true),
        None => (html.to_string(), false),
    };

    let cleaned = remove_unwanted(&processed, config, config.remove_chrome && !has_main);
    if config.collapse_breaks {
        BREAK_RUN.replace_all(&cleaned, "<br>").into_owned()
    } else {
        cleaned
    }
}

/// The `div[role="main"]` subtree wrapped in a bare document, if present.
pub fn extract_main_content(html: &str) -> Option<String> {
    let document = Document::parse(html);
    let main = document.select(r#"div[role="main"]"#).ok()?.into_iter().next()?;
    Some(format!("<html><body>{}</body></html>", main.outer_html()))
}

/// Remove every unwanted element and comment in one pass.
fn remove_unwanted(html: &str, config: &PreprocessConfig, remove_chrome: bool) -> String {
    let mut removable: Vec<&str> = Vec::new();
    if config.remove_scripts {
        removable.push("script");
    }
    if config.remove_styles {
        removable.push("style");
    }
    if config.remove_noscript {
        removable.push("noscript");
    }
    if config.remove_head {
        removable.push("head");
    }
    if remove_chrome {
        removable.extend_from_slice(CHROME_SELECTORS);
    }

    let mut handlers: Vec<_> = removable
        .into_iter()
        .map(|selector| {
            lol_html::element!(selector, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    if config.remove_comments {
        handlers.push(lol_html::comments!("*", |c| {
            c.remove();
            Ok(())
        }));
    }

    if handlers.is_empty() {
        return html.to_string();
    }

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    match rewriter.write(html.as_bytes()) {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    match rewriter.end() {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    if output.is_empty() { html.to_string() } else { output }
}
