//! Read-only HTML queries.
//!
//! [`Document`] wraps a parsed page for CSS-selector lookups (titles, meta
//! tags, the main-content region). All rewriting happens in streaming
//! `lol_html` passes elsewhere; this side never mutates the tree.
//!
//! # Example
//!
//! ```rust
//! use folio_core::parse::Document;
//!
//! let doc = Document::parse("<html><head><title>Install</title></head><body><p>Hi</p></body></html>");
//! assert_eq!(doc.title(), Some("Install".to_string()));
//! assert_eq!(doc.select("p").unwrap().len(), 1);
//! ```

use scraper::{Html, Selector};

use crate::{FolioError, Result};

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse a full HTML document. Parsing is error-tolerant and never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Select elements with a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel =
            Selector::parse(selector).map_err(|e| FolioError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Trimmed text of the first `<title>`, if it has any.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        let text: String = self.html.select(&selector).next()?.text().collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Every `<meta name=.. content=..>` pair with both attributes non-empty, in document order.
    pub fn meta_pairs(&self) -> Vec<(String, String)> {
        let Ok(elements) = self.select("meta[name][content]") else {
            return Vec::new();
        };
        elements
            .iter()
            .filter_map(|el| {
                let name = el.attr("name")?.trim();
                let content = el.attr("content")?.trim();
                (!name.is_empty() && !content.is_empty()).then(|| (name.to_string(), content.to_string()))
            })
            .collect()
    }
}

/// A borrowed element of a [`Document`].
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// The element's own markup, tags included.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }
}
