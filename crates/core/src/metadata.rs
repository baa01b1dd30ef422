use indexmap::IndexMap;
use serde::Serialize;

use crate::parse::Document;

/// Page metadata carried into the Markdown output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    /// Every `<meta name content>` pair; a repeated name keeps its last value.
    pub meta: IndexMap<String, String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.meta.is_empty()
    }
}

impl Document {
    /// Collect the `<title>` and all named meta tags.
    pub fn extract_metadata(&self) -> Metadata {
        let mut meta = IndexMap::new();
        for (name, content) in self.meta_pairs() {
            meta.insert(name, content);
        }

        let lookup = |key: &str| {
            meta.iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, content)| content.clone())
        };
        let description = lookup("description");
        let keywords = lookup("keywords");

        Metadata { title: self.title(), description, keywords, meta }
    }
}
