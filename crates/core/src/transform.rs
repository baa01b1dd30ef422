//! Single-document HTML to Markdown transformation.
//!
//! A document is cleaned, its `<img>` and `<a>` elements are rewritten in one
//! streaming pass, and the result is converted to Markdown. Image sources are
//! registered with the [`ReferenceIndex`] before their placeholder path is
//! written; document links are resolved to their final URLs on the spot.

use std::fs;
use std::path::Path;

use crate::formatters::{MarkdownConfig, convert_to_markdown};
use crate::metadata::Metadata;
use crate::parse::Document;
use crate::paths::{decode_target, is_remote_image, strip_query};
use crate::postprocess::{PostProcessConfig, postprocess_markdown};
use crate::preprocess::{PreprocessConfig, preprocess_html};
use crate::references::ReferenceIndex;
use crate::resolver::PathResolver;
use crate::{FolioError, Result};

/// Output of transforming one document.
#[derive(Debug, Clone)]
pub struct TransformedDocument {
    pub markdown: String,
    pub metadata: Metadata,
    /// Local image sources registered for this document, in order of appearance.
    pub images: Vec<String>,
    /// Number of `<a href>` elements seen.
    pub links: usize,
    /// Links that escaped the input root.
    pub warnings: Vec<String>,
}

/// HTML with rewritten image and link targets, plus what was found on the way.
#[derive(Debug, Default)]
struct RewrittenHtml {
    html: String,
    images: Vec<String>,
    links: usize,
    warnings: Vec<String>,
}

/// Converts documents of one source tree.
pub struct DocumentTransformer<'a> {
    resolver: &'a PathResolver,
    preprocess: PreprocessConfig,
    markdown: MarkdownConfig,
    postprocess: PostProcessConfig,
}

impl<'a> DocumentTransformer<'a> {
    pub fn new(resolver: &'a PathResolver) -> Self {
        Self {
            resolver,
            preprocess: PreprocessConfig::default(),
            markdown: MarkdownConfig::default(),
            postprocess: PostProcessConfig::default(),
        }
    }

    pub fn with_markdown_config(mut self, config: MarkdownConfig) -> Self {
        self.markdown = config;
        self
    }

    pub fn with_preprocess_config(mut self, config: PreprocessConfig) -> Self {
        self.preprocess = config;
        self
    }

    /// Read and transform a document from disk.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, cannot be read or is not valid UTF-8.
    pub fn transform_file(&self, source: &Path, index: &mut ReferenceIndex) -> Result<TransformedDocument> {
        if !source.is_file() {
            return Err(FolioError::FileNotFound(source.to_path_buf()));
        }
        let bytes = fs::read(source)?;
        let html = String::from_utf8(bytes).map_err(|_| FolioError::InvalidEncoding(source.to_path_buf()))?;
        self.transform(source, &html, index)
    }

    /// Transform HTML that was read from `source`.
    pub fn transform(&self, source: &Path, html: &str, index: &mut ReferenceIndex) -> Result<TransformedDocument> {
        let _span = tracing::debug_span!("transform", source = %source.display()).entered();

        let metadata = Document::parse(html).extract_metadata();
        let cleaned = preprocess_html(html, &self.preprocess);
        let rewritten = rewrite_references(&cleaned, source, self.resolver, index)?;
        let markdown = convert_to_markdown(&rewritten.html, &metadata, &self.markdown);
        let markdown = postprocess_markdown(&markdown, &self.postprocess);

        tracing::debug!(images = rewritten.images.len(), links = rewritten.links, "Transformed document");

        Ok(TransformedDocument {
            markdown,
            metadata,
            images: rewritten.images,
            links: rewritten.links,
            warnings: rewritten.warnings,
        })
    }
}

/// Alt text for an image without one: the source's file stem, else `image`.
fn fallback_alt(src: &str) -> String {
    let decoded = decode_target(strip_query(src));
    let name = decoded.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    if stem.is_empty() { "image".to_string() } else { stem.to_string() }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Rewrite `<img>` and `<a>` targets, registering local images with `index`.
fn rewrite_references(
    html: &str, source: &Path, resolver: &PathResolver, index: &mut ReferenceIndex,
) -> Result<RewrittenHtml> {
    let mut images = Vec::new();
    let mut links = 0usize;
    let mut warnings = Vec::new();
    let mut output = String::new();

    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![
                lol_html::element!("img", |el| {
                    let src = el.get_attribute("src").unwrap_or_default();
                    let title = el.get_attribute("title");
                    el.remove_attribute("title");

                    let alt = non_blank(el.get_attribute("alt"))
                        .or_else(|| non_blank(title))
                        .unwrap_or_else(|| fallback_alt(&src));
                    el.set_attribute("alt", &alt)?;

                    if src.trim().is_empty() || is_remote_image(&src) || src.starts_with("data:") {
                        return Ok(());
                    }

                    index.add_reference(&src, source);
                    el.set_attribute("src", &resolver.placeholder_image_path(&src))?;
                    images.push(src);
                    Ok(())
                }),
                lol_html::element!("a", |el| {
                    el.remove_attribute("title");
                    let Some(href) = el.get_attribute("href") else {
                        return Ok(());
                    };
                    links += 1;

                    let link = resolver.resolve_link(source, &href);
                    if let Some(warning) = link.warning {
                        warnings.push(warning);
                    }
                    if link.href != href {
                        el.set_attribute("href", &link.href)?;
                    }
                    Ok(())
                }),
            ],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| FolioError::HtmlParseError(e.to_string()))?;
    rewriter.end().map_err(|e| FolioError::HtmlParseError(e.to_string()))?;

    Ok(RewrittenHtml { html: output, images, links, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn resolver() -> PathResolver {
        PathResolver::new(Path::new("/src/guide"), Path::new("/site/docs/guide"), "guide")
    }

    fn source() -> PathBuf {
        PathBuf::from("/src/guide/Admin/Users.html")
    }

    #[test]
    fn test_images_registered_before_placeholder() {
        let r = resolver();
        let mut index = ReferenceIndex::new();
        let html = r#"<p><img src="img/Screen Shot.png" alt="Shot"><img src="https://cdn.example.com/x.png"></p>"#;

        let rewritten = rewrite_references(html, &source(), &r, &mut index).unwrap();
        assert!(rewritten.html.contains(r#"src="/static/img/guide/screen_shot.png""#));
        assert!(rewritten.html.contains(r#"src="https://cdn.example.com/x.png""#));
        assert_eq!(rewritten.images, vec!["img/Screen Shot.png"]);
        assert_eq!(index.documents("img/Screen Shot.png").unwrap(), &[source()]);
        assert!(index.documents("https://cdn.example.com/x.png").is_none());
    }

    #[test]
    fn test_alt_fallbacks() {
        let r = resolver();
        let mut index = ReferenceIndex::new();
        let html = r#"<img src="a.png" title="From title"><img src="img/diagram.v2.svg"><img src="" alt="">"#;

        let rewritten = rewrite_references(html, &source(), &r, &mut index).unwrap();
        assert!(rewritten.html.contains(r#"alt="From title""#));
        assert!(rewritten.html.contains(r#"alt="diagram""#));
        assert!(rewritten.html.contains(r#"alt="image""#));
        assert!(!rewritten.html.contains("title="));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_links_resolved_and_titles_dropped() {
        let r = resolver();
        let mut index = ReferenceIndex::new();
        let html = r##"<a href="../Setup/Install.html#Top" title="t">Install</a> <a href="https://example.com">Ext</a> <a name="x">Named</a>"##;

        let rewritten = rewrite_references(html, &source(), &r, &mut index).unwrap();
        assert!(rewritten.html.contains(r#"href="/guide/setup/install.md#Top""#));
        assert!(rewritten.html.contains(r#"href="https://example.com""#));
        assert!(!rewritten.html.contains("title="));
        assert_eq!(rewritten.links, 2);
        assert!(rewritten.warnings.is_empty());
    }

    #[test]
    fn test_outside_root_link_warns() {
        let r = resolver();
        let mut index = ReferenceIndex::new();
        let rewritten =
            rewrite_references(r#"<a href="../../../x.html">X</a>"#, &source(), &r, &mut index).unwrap();
        assert_eq!(rewritten.warnings.len(), 1);
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn test_transform_end_to_end() {
        let r = resolver();
        let transformer = DocumentTransformer::new(&r);
        let mut index = ReferenceIndex::new();
        let html = r##"
            <html><head><title>Users</title><script>track()</script></head>
            <body>
                <nav>Menu</nav>
                <p>Manage <a href="Roles.html#Assigning_Roles">Assigning Roles</a>.</p>
                <p><img src="img/users.png" alt="Users"></p>
            </body></html>
        "##;

        let doc = transformer.transform(&source(), html, &mut index).unwrap();
        assert!(doc.markdown.starts_with("# Users\n\n"));
        assert!(doc.markdown.contains("[Assigning Roles](/guide/admin/roles.md#assigning-roles)"));
        assert!(doc.markdown.contains("![Users](/static/img/guide/users.png)"));
        assert!(!doc.markdown.contains("Menu"));
        assert!(!doc.markdown.contains("track()"));
        assert!(doc.markdown.ends_with('\n') && !doc.markdown.ends_with("\n\n"));
        assert_eq!(doc.metadata.title.as_deref(), Some("Users"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_transform_file_rejects_invalid_utf8() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("guide");
        fs::create_dir_all(&root).unwrap();
        let file = root.join("latin1.html");
        fs::write(&file, [0x3c, 0x70, 0x3e, 0xe9, 0xff, 0x3c, 0x2f, 0x70, 0x3e]).unwrap();

        let r = PathResolver::new(&root, &tmp.path().join("out"), "guide");
        let transformer = DocumentTransformer::new(&r);
        let mut index = ReferenceIndex::new();
        let result = transformer.transform_file(&file, &mut index);
        assert!(matches!(result, Err(FolioError::InvalidEncoding(_))));
    }

    #[test]
    fn test_transform_file_missing() {
        let r = resolver();
        let transformer = DocumentTransformer::new(&r);
        let mut index = ReferenceIndex::new();
        let result = transformer.transform_file(Path::new("/src/guide/nope.html"), &mut index);
        assert!(matches!(result, Err(FolioError::FileNotFound(_))));
    }

    #[test]
    fn test_fallback_alt() {
        assert_eq!(fallback_alt("../img/My%20Chart.final.png?x=1"), "My Chart");
        assert_eq!(fallback_alt("folder/"), "image");
    }
}
