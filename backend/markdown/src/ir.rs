//! Markdown Intermediate Representation
//!
//! Parses markdown syntax into a strongly-typed AST. The parser is a small
//! state machine over `pulldown-cmark` events: every `Start` opens a frame,
//! every `End` closes the innermost one and attaches the finished node to
//! its parent.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MarkdownNode {
    Heading(u32, Vec<MarkdownNode>),
    Paragraph(Vec<MarkdownNode>),
    Text(String),
    Strong(Vec<MarkdownNode>),
    Emphasis(Vec<MarkdownNode>),
    Code(String),
    CodeBlock(String, String), // language, content
    List(Option<u64>, Vec<MarkdownNode>), // start number when ordered
    ListItem(Vec<MarkdownNode>),
    Blockquote(Vec<MarkdownNode>),
    Link(String, Vec<MarkdownNode>), // url, label
    Image(String, String), // url, alt_text
    LineBreak,
    Rule,
}

enum Frame {
    Heading(u32),
    Paragraph,
    Strong,
    Emphasis,
    CodeBlock(String),
    List(Option<u64>),
    Item,
    Blockquote,
    Link(String),
    Image(String),
    /// Containers we don't model (tables, strikethrough, footnotes): their
    /// children are spliced into the parent.
    Transparent,
}

impl Frame {
    fn from_tag(tag: &Tag<'_>) -> Self {
        match tag {
            Tag::Heading(level, _, _) => Frame::Heading(heading_depth(*level)),
            Tag::Paragraph => Frame::Paragraph,
            Tag::Strong => Frame::Strong,
            Tag::Emphasis => Frame::Emphasis,
            Tag::CodeBlock(CodeBlockKind::Fenced(lang)) => Frame::CodeBlock(lang.to_string()),
            Tag::CodeBlock(CodeBlockKind::Indented) => Frame::CodeBlock(String::new()),
            Tag::List(start) => Frame::List(*start),
            Tag::Item => Frame::Item,
            Tag::BlockQuote => Frame::Blockquote,
            Tag::Link(_, url, _) => Frame::Link(url.to_string()),
            Tag::Image(_, url, _) => Frame::Image(url.to_string()),
            _ => Frame::Transparent,
        }
    }

    fn close(self, children: Vec<MarkdownNode>) -> Vec<MarkdownNode> {
        let node = match self {
            Frame::Heading(depth) => MarkdownNode::Heading(depth, children),
            Frame::Paragraph => MarkdownNode::Paragraph(children),
            Frame::Strong => MarkdownNode::Strong(children),
            Frame::Emphasis => MarkdownNode::Emphasis(children),
            Frame::CodeBlock(lang) => MarkdownNode::CodeBlock(lang, flatten_text(&children)),
            Frame::List(start) => MarkdownNode::List(start, children),
            Frame::Item => MarkdownNode::ListItem(children),
            Frame::Blockquote => MarkdownNode::Blockquote(children),
            Frame::Link(url) => MarkdownNode::Link(url, children),
            Frame::Image(url) => MarkdownNode::Image(url, flatten_text(&children)),
            Frame::Transparent => return children,
        };
        vec![node]
    }
}

fn heading_depth(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Concatenated text content of a subtree.
pub fn flatten_text(nodes: &[MarkdownNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            MarkdownNode::Text(text) | MarkdownNode::Code(text) => out.push_str(text),
            MarkdownNode::CodeBlock(_, content) => out.push_str(content),
            MarkdownNode::Image(_, alt) => out.push_str(alt),
            MarkdownNode::LineBreak => out.push('\n'),
            MarkdownNode::Rule => {}
            MarkdownNode::Heading(_, children)
            | MarkdownNode::Paragraph(children)
            | MarkdownNode::Strong(children)
            | MarkdownNode::Emphasis(children)
            | MarkdownNode::List(_, children)
            | MarkdownNode::ListItem(children)
            | MarkdownNode::Blockquote(children)
            | MarkdownNode::Link(_, children) => out.push_str(&flatten_text(children)),
        }
    }
    out
}

fn push_text(nodes: &mut Vec<MarkdownNode>, text: &str) {
    if let Some(MarkdownNode::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(MarkdownNode::Text(text.to_string()));
    }
}

pub struct IrParser;

impl IrParser {
    /// Tokenizes and processes standard Markdown into an Intermediate Representation.
    ///
    /// Partial documents (a stream cut mid-sentence) parse fine; unclosed
    /// emphasis simply stays literal text.
    pub fn parse(markdown: &str) -> Vec<MarkdownNode> {
        let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);

        let mut root: Vec<MarkdownNode> = Vec::new();
        let mut stack: Vec<(Frame, Vec<MarkdownNode>)> = Vec::new();

        for event in parser {
            match event {
                Event::Start(tag) => stack.push((Frame::from_tag(&tag), Vec::new())),
                Event::End(_) => {
                    if let Some((frame, children)) = stack.pop() {
                        let closed = frame.close(children);
                        let parent = stack.last_mut().map(|(_, c)| c).unwrap_or(&mut root);
                        for node in closed {
                            match node {
                                MarkdownNode::Text(text) => push_text(parent, &text),
                                other => parent.push(other),
                            }
                        }
                    }
                }
                Event::Text(text) | Event::Html(text) => {
                    let target = stack.last_mut().map(|(_, c)| c).unwrap_or(&mut root);
                    push_text(target, &text);
                }
                Event::Code(code) => {
                    let target = stack.last_mut().map(|(_, c)| c).unwrap_or(&mut root);
                    target.push(MarkdownNode::Code(code.to_string()));
                }
                Event::SoftBreak => {
                    let target = stack.last_mut().map(|(_, c)| c).unwrap_or(&mut root);
                    push_text(target, "\n");
                }
                Event::HardBreak => {
                    let target = stack.last_mut().map(|(_, c)| c).unwrap_or(&mut root);
                    target.push(MarkdownNode::LineBreak);
                }
                Event::Rule => {
                    let target = stack.last_mut().map(|(_, c)| c).unwrap_or(&mut root);
                    target.push(MarkdownNode::Rule);
                }
                _ => {}
            }
        }

        root
    }
}
