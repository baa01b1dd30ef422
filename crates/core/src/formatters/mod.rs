pub mod markdown;

pub use markdown::{MarkdownConfig, convert_to_markdown};
