//! Markdown Intermediate Representation Parser and HTML Renderer
//!
//! Converts Markdown produced by vision models into a typed tree and then
//! into the restricted HTML shown in the description panel.

pub mod ir;
pub mod renderer;

pub use ir::{IrParser, MarkdownNode};
pub use renderer::{escape_text, Renderer, HEADING_OFFSET};

/// Parse and render in one step.
pub fn markdown_to_html(markdown: &str) -> String {
    Renderer::to_html(&IrParser::parse(markdown))
}
