use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::paths::{MARKDOWN_DESTINATION, MARKDOWN_LINK_TEXT, is_external_url, slugify_anchor, split_anchor};

static INLINE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(!?)\[({})\]\(({})\)", MARKDOWN_LINK_TEXT, MARKDOWN_DESTINATION)).expect("inline link pattern")
});

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line pattern"));

/// Configuration for Markdown clean-up after conversion
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Replace link fragments with a slug of the link text
    pub slug_anchors: bool,
    /// Indent fenced code blocks that follow an ordered-list item
    pub fix_list_code_blocks: bool,
    /// Collapse runs of blank lines
    pub collapse_blank_lines: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self { slug_anchors: true, fix_list_code_blocks: true, collapse_blank_lines: true }
    }
}

/// Clean up converted Markdown. The result is trimmed and ends with exactly one newline.
pub fn postprocess_markdown(markdown: &str, config: &PostProcessConfig) -> String {
    let mut processed = markdown.to_string();

    if config.slug_anchors {
        processed = slug_link_anchors(&processed);
    }

    if config.fix_list_code_blocks {
        processed = fix_list_code_blocks(&processed);
    }

    if config.collapse_blank_lines {
        processed = EXCESS_BLANK_LINES.replace_all(&processed, "\n\n").into_owned();
    }

    let mut out = processed.trim().to_string();
    out.push('\n');
    out
}

/// Rewrite `[text](target#fragment)` so the fragment is the slug of `text`.
///
/// Images, linked images, external targets and links without a fragment are
/// left alone, as is any link whose text slugs to nothing.
pub fn slug_link_anchors(markdown: &str) -> String {
    INLINE_LINK
        .replace_all(markdown, |caps: &Captures| {
            let whole = caps[0].to_string();
            let text = &caps[2];
            let target = &caps[3];

            if &caps[1] == "!" || text.starts_with("![") || is_external_url(target) || !target.contains('#') {
                return whole;
            }

            let slug = slugify_anchor(text);
            if slug.is_empty() {
                return whole;
            }

            let (path, _) = split_anchor(target);
            format!("[{}]({}#{})", text, path, slug)
        })
        .into_owned()
}

fn is_ordered_item(line: &str) -> bool {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with(". ")
}

/// Indent a fenced code block that directly follows an ordered-list item so it
/// renders inside the item instead of ending the list.
fn fix_list_code_blocks(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut fixed: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let follows_item = fixed
            .iter()
            .rev()
            .find(|l| !l.trim().is_empty())
            .is_some_and(|l| is_ordered_item(l));

        if line.starts_with("```") && follows_item {
            while fixed.last().is_some_and(|l| l.trim().is_empty()) {
                fixed.pop();
            }
            fixed.push(String::new());
            fixed.push(format!("    {}", line));

            let closed_inline = line.len() > 3 && line.trim_end().ends_with("```") && line.matches("```").count() > 1;
            if !closed_inline {
                i += 1;
                while i < lines.len() {
                    let inner = lines[i];
                    fixed.push(if inner.is_empty() { String::new() } else { format!("    {}", inner) });
                    if inner.trim_start().starts_with("```") {
                        break;
                    }
                    i += 1;
                }
            }
            fixed.push(String::new());
        } else {
            fixed.push(line.to_string());
        }
        i += 1;
    }

    fixed.join("\n")
}
