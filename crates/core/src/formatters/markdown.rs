use crate::metadata::Metadata;

/// Configuration for Markdown conversion
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Include TOML frontmatter with metadata
    pub include_frontmatter: bool,
    /// Prepend the page title as an H1 when the body does not open with a heading
    pub include_title_heading: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { include_frontmatter: false, include_title_heading: true }
    }
}

/// Convert preprocessed HTML to Markdown with optional frontmatter and title heading.
///
/// The body is converted first; the title heading is only added when the
/// converted body does not already start with `#`.
pub fn convert_to_markdown(html: &str, metadata: &Metadata, config: &MarkdownConfig) -> String {
    let body = html_to_markdown(html);
    let body = body.trim_start();

    let mut output = String::new();

    if config.include_frontmatter && !metadata.is_empty() {
        output.push_str(&generate_frontmatter(metadata));
        output.push('\n');
    }

    if config.include_title_heading
        && !body.starts_with('#')
        && let Some(title) = &metadata.title
    {
        output.push_str(&format!("# {}\n\n", title));
    }

    output.push_str(body);
    output
}

/// Generate TOML frontmatter from metadata
fn generate_frontmatter(metadata: &Metadata) -> String {
    let mut frontmatter = String::from("+++");

    if let Some(title) = &metadata.title {
        frontmatter.push_str(&format!("\ntitle = {}", toml_escape_string(title)));
    }

    if let Some(description) = &metadata.description {
        frontmatter.push_str(&format!("\ndescription = {}", toml_escape_string(description)));
    }

    if let Some(keywords) = &metadata.keywords {
        let list: Vec<String> = keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(toml_escape_string)
            .collect();
        frontmatter.push_str(&format!("\nkeywords = [{}]", list.join(", ")));
    }

    frontmatter.push_str("\n+++\n");
    frontmatter
}

/// Escape a string for TOML format
fn toml_escape_string(s: &str) -> String {
    format!(
        "\"{}\"",
        s.replace('\\', "\\\\").replace('\"', "\\\"").replace('\n', "\\n")
    )
}

/// Convert HTML to Markdown using htmd crate
#[cfg(feature = "markdown")]
fn html_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_default()
}

/// Fallback HTML to text conversion when markdown feature is disabled
#[cfg(not(feature = "markdown"))]
fn html_to_markdown(html: &str) -> String {
    let doc = scraper::Html::parse_document(html);
    doc.root_element().text().collect::<String>()
}
