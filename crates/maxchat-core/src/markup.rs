//! Markup fragment model
//!
//! Replies are formatted into a small HTML-like markup (see [`crate::markdown`])
//! and canned replies are written in the same markup. This module turns such a
//! fragment into a tree of [`Node`]s that sinks can store and UIs can draw.
//!
//! The parser is deliberately lenient: sentences are split on formatted text,
//! so a fragment may open a tag it never closes or close one it never opened.
//! Unclosed elements are closed at the end of the fragment, stray closing tags
//! are dropped, and a `<` that does not start a known tag is plain text.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::code_block::CodeBlock;

/// Element kinds the formatter and canned replies produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Strong,
    Emphasis,
    Code,
    Link,
    ListItem,
    List,
    LineBreak,
    Span,
    Paragraph,
}

impl Tag {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "strong" => Some(Tag::Strong),
            "em" => Some(Tag::Emphasis),
            "code" => Some(Tag::Code),
            "a" => Some(Tag::Link),
            "li" => Some(Tag::ListItem),
            "ul" => Some(Tag::List),
            "br" => Some(Tag::LineBreak),
            "span" => Some(Tag::Span),
            "p" => Some(Tag::Paragraph),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Strong => "strong",
            Tag::Emphasis => "em",
            Tag::Code => "code",
            Tag::Link => "a",
            Tag::ListItem => "li",
            Tag::List => "ul",
            Tag::LineBreak => "br",
            Tag::Span => "span",
            Tag::Paragraph => "p",
        }
    }

    /// Elements that never have children
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::LineBreak)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Tag,
    pub classes: Vec<String>,
    pub href: Option<String>,
    /// Entrance animation offset, assigned once a reply has fully rendered
    pub animation_delay: Option<Duration>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            classes: Vec::new(),
            href: None,
            animation_delay: None,
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn text(&self) -> String {
        text_content(&self.children)
    }
}

/// One node of a rendered message
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Element(Element),
    CodeBlock(CodeBlock),
}

impl Node {
    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Element(element) if element.tag == Tag::LineBreak => "\n".to_string(),
            Node::Element(element) => element.text(),
            Node::CodeBlock(block) => block.code().to_string(),
        }
    }
}

/// Concatenated text of a node list, line breaks included
pub fn text_content(nodes: &[Node]) -> String {
    nodes.iter().map(Node::text_content).collect()
}

enum TagToken {
    Open { element: Element, self_closing: bool },
    Close(Tag),
}

/// Parse a markup fragment into its top-level nodes
pub fn parse(fragment: &str) -> Vec<Node> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut text = String::new();
    let mut rest = fragment;

    while let Some(pos) = rest.find('<') {
        text.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let Some((token, consumed)) = parse_tag(tail) else {
            text.push('<');
            rest = &tail[1..];
            continue;
        };

        flush_text(&mut text, &mut stack, &mut root);
        match token {
            TagToken::Open { element, self_closing } => {
                if self_closing || element.tag.is_void() {
                    push_child(&mut stack, &mut root, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
            TagToken::Close(tag) => {
                if stack.iter().any(|open| open.tag == tag) {
                    while let Some(open) = stack.pop() {
                        let matched = open.tag == tag;
                        push_child(&mut stack, &mut root, Node::Element(open));
                        if matched {
                            break;
                        }
                    }
                }
            }
        }
        rest = &tail[consumed..];
    }

    text.push_str(rest);
    flush_text(&mut text, &mut stack, &mut root);

    while let Some(open) = stack.pop() {
        push_child(&mut stack, &mut root, Node::Element(open));
    }

    root
}

fn flush_text(text: &mut String, stack: &mut [Element], root: &mut Vec<Node>) {
    if text.is_empty() {
        return;
    }
    let decoded = decode_entities(&std::mem::take(text));
    push_child(stack, root, Node::Text(decoded));
}

fn push_child(stack: &mut [Element], root: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => root.push(node),
    }
}

/// Parse one tag at the start of `s` (which begins with `<`).
/// Returns the token and the number of bytes consumed.
fn parse_tag(s: &str) -> Option<(TagToken, usize)> {
    let end = s.find('>')?;
    let inner = &s[1..end];

    if let Some(name) = inner.strip_prefix('/') {
        let tag = Tag::from_name(name.trim())?;
        return Some((TagToken::Close(tag), end + 1));
    }

    let name_len = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let name = &inner[..name_len];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let tag = Tag::from_name(name)?;
    let attrs = &inner[name_len..];

    let mut element = Element::new(tag);
    for caps in attribute_pattern().captures_iter(attrs) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| decode_entities(m.as_str()))
            .unwrap_or_default();
        match caps[1].to_ascii_lowercase().as_str() {
            "class" => {
                for class in value.split_whitespace() {
                    element.add_class(class);
                }
            }
            "href" => element.href = Some(value),
            _ => {}
        }
    }

    let self_closing = attrs.trim_end().ends_with('/');
    Some((TagToken::Open { element, self_closing }, end + 1))
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([A-Za-z][A-Za-z0-9_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
            .expect("attribute pattern is valid")
    })
}

/// Decode the handful of entities the markup can contain. `&amp;` goes last so
/// `&amp;lt;` decodes to `&lt;` rather than `<`.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
