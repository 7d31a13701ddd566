//! HTML renderer for the Markdown IR
//!
//! Output is deliberately narrow: headings are pushed down so they never
//! outrank the panel's own titles, links are kept only for web schemes, and
//! all text is escaped.

use pulldown_cmark::escape::{escape_href, escape_html};

use crate::ir::MarkdownNode;

/// Levels added to every heading: `#` renders as `<h3>`, `###` as `<h5>`.
pub const HEADING_OFFSET: u32 = 2;
const MAX_HEADING: u32 = 6;

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let _ = escape_html(&mut out, text);
    out
}

fn is_safe_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("mailto:")
}

pub struct Renderer;

impl Renderer {
    /// Renders AST to HTML.
    pub fn to_html(nodes: &[MarkdownNode]) -> String {
        let mut out = String::new();
        Self::write_html(&mut out, nodes);
        out
    }

    fn write_html(out: &mut String, nodes: &[MarkdownNode]) {
        for node in nodes {
            match node {
                MarkdownNode::Text(text) => {
                    let _ = escape_html(&mut *out, text);
                }
                MarkdownNode::Paragraph(children) => Self::wrap(out, "p", children),
                MarkdownNode::Heading(depth, children) => {
                    let level = (depth + HEADING_OFFSET).min(MAX_HEADING);
                    Self::wrap(out, &format!("h{level}"), children);
                }
                MarkdownNode::Strong(children) => Self::wrap(out, "strong", children),
                MarkdownNode::Emphasis(children) => Self::wrap(out, "em", children),
                MarkdownNode::Code(code) => {
                    out.push_str("<code>");
                    let _ = escape_html(&mut *out, code);
                    out.push_str("</code>");
                }
                MarkdownNode::CodeBlock(lang, content) => {
                    if lang.is_empty() {
                        out.push_str("<pre><code>");
                    } else {
                        out.push_str("<pre><code class=\"language-");
                        let _ = escape_html(&mut *out, lang);
                        out.push_str("\">");
                    }
                    let _ = escape_html(&mut *out, content);
                    out.push_str("</code></pre>");
                }
                MarkdownNode::List(None, items) => Self::wrap(out, "ul", items),
                MarkdownNode::List(Some(1), items) => Self::wrap(out, "ol", items),
                MarkdownNode::List(Some(start), items) => {
                    out.push_str(&format!("<ol start=\"{start}\">"));
                    Self::write_html(out, items);
                    out.push_str("</ol>");
                }
                MarkdownNode::ListItem(children) => Self::wrap(out, "li", children),
                MarkdownNode::Blockquote(children) => Self::wrap(out, "blockquote", children),
                MarkdownNode::Link(url, children) if is_safe_url(url) => {
                    out.push_str("<a href=\"");
                    let _ = escape_href(&mut *out, url);
                    out.push_str("\" rel=\"noopener noreferrer\">");
                    Self::write_html(out, children);
                    out.push_str("</a>");
                }
                MarkdownNode::Link(_, children) => Self::write_html(out, children),
                // Remote images are never fetched; the alt text stands in.
                MarkdownNode::Image(_, alt) => {
                    let _ = escape_html(&mut *out, alt);
                }
                MarkdownNode::LineBreak => out.push_str("<br />"),
                MarkdownNode::Rule => out.push_str("<hr />"),
            }
        }
    }

    fn wrap(out: &mut String, tag: &str, children: &[MarkdownNode]) {
        out.push('<');
        out.push_str(tag);
        out.push('>');
        Self::write_html(out, children);
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown_to_html;

    #[test]
    fn test_emphasis_and_paragraphs() {
        let html = markdown_to_html("A **white** cup.\n\nOn a *wooden* desk.");
        assert_eq!(
            html,
            "<p>A <strong>white</strong> cup.</p><p>On a <em>wooden</em> desk.</p>"
        );
    }

    #[test]
    fn test_headings_are_bounded() {
        assert_eq!(markdown_to_html("# Title"), "<h3>Title</h3>");
        assert_eq!(markdown_to_html("### Details"), "<h5>Details</h5>");
        assert_eq!(markdown_to_html("#### Fine print"), "<h6>Fine print</h6>");
        assert_eq!(markdown_to_html("###### Deepest"), "<h6>Deepest</h6>");
    }

    #[test]
    fn test_list_items() {
        let html = markdown_to_html("- cup\n- plate\n");
        assert_eq!(html, "<ul><li>cup</li><li>plate</li></ul>");
    }

    #[test]
    fn test_ordered_list_start() {
        assert_eq!(markdown_to_html("1. a\n"), "<ol><li>a</li></ol>");
        assert_eq!(markdown_to_html("2. b\n"), "<ol start=\"2\"><li>b</li></ol>");
    }

    #[test]
    fn test_text_is_escaped() {
        let html = markdown_to_html("Sign says <script>alert(1)</script> & more");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; more"));
    }

    #[test]
    fn test_unsafe_links_lose_href() {
        let html = markdown_to_html("[click](javascript:alert(1)) [site](https://example.com)");
        assert!(!html.contains("javascript:"));
        assert!(html.contains("<a href=\"https://example.com\" rel=\"noopener noreferrer\">site</a>"));
    }

    #[test]
    fn test_ast_roundtrips_through_serde() {
        let nodes = crate::IrParser::parse("**x**");
        let json = serde_json::to_string(&nodes).unwrap();
        let back: Vec<MarkdownNode> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, nodes);
    }
}
