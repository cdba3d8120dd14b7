//! UI-agnostic chat transcript
//!
//! The transcript is the ordered list of visible messages. It is never
//! persisted and is dropped wholesale when the user clears the chat.

use std::time::{Duration, Instant};

use crate::code_block::CodeBlock;
use crate::markdown::{FADE_LIST_CLASS, INLINE_CODE_CLASS};
use crate::markup::{self, Element, Node, Tag};
use crate::sink::Sink;

/// Added to inline code spans once their delay is assigned
pub const FADE_IN_INLINE_CLASS: &str = "fade-in-inline";

/// Who sent a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: Vec<Node>,
    /// When entrance delays were assigned, i.e. when the reply finished
    pub settled_at: Option<Instant>,
    paragraph_open: bool,
}

impl ChatMessage {
    pub fn new(sender: Sender) -> Self {
        Self {
            sender,
            content: Vec::new(),
            settled_at: None,
            paragraph_open: false,
        }
    }

    /// A user message; the prompt is shown as typed, never as markup
    pub fn user(text: &str) -> Self {
        let mut message = Self::new(Sender::User);
        message.content.push(Node::Text(text.to_string()));
        message
    }

    /// An AI message from ready-made markup, shown without animation
    pub fn ai_markup(markup: &str) -> Self {
        let mut message = Self::new(Sender::Ai);
        message.content = markup::parse(markup);
        message
    }

    pub fn text(&self) -> String {
        markup::text_content(&self.content)
    }

    pub fn code_blocks(&self) -> Vec<&CodeBlock> {
        let mut blocks = Vec::new();
        collect_code_blocks(&self.content, &mut blocks);
        blocks
    }

    pub fn code_block_mut(&mut self, index: usize) -> Option<&mut CodeBlock> {
        code_blocks_mut(&mut self.content).into_iter().nth(index)
    }

    fn with_container<T>(&mut self, f: impl FnOnce(&mut Vec<Node>) -> T) -> T {
        let paragraph_open = self.paragraph_open;
        match self.content.last_mut() {
            Some(Node::Element(paragraph)) if paragraph_open && paragraph.tag == Tag::Paragraph => {
                f(&mut paragraph.children)
            }
            _ => f(&mut self.content),
        }
    }
}

impl Sink for ChatMessage {
    fn append_text(&mut self, text: &str) {
        self.with_container(|container| match container.last_mut() {
            Some(Node::Text(existing)) => existing.push_str(text),
            _ => container.push(Node::Text(text.to_string())),
        });
    }

    fn append_node(&mut self, node: Node) {
        self.with_container(|container| container.push(node));
    }

    fn start_paragraph(&mut self) {
        self.content.push(Node::Element(Element::new(Tag::Paragraph)));
        self.paragraph_open = true;
    }

    fn end_paragraph(&mut self) {
        self.paragraph_open = false;
    }

    fn clear(&mut self) {
        self.content.clear();
        self.paragraph_open = false;
        self.settled_at = None;
    }

    fn set_entrance_delays(&mut self, list_item: Duration, inline_code: Duration) {
        let mut counters = StaggerCounters::default();
        stagger(&mut self.content, false, &mut counters, list_item, inline_code);
        self.settled_at = Some(Instant::now());
    }
}

#[derive(Default)]
struct StaggerCounters {
    list_items: u32,
    inline_code: u32,
}

fn stagger(
    nodes: &mut [Node],
    in_fade_list: bool,
    counters: &mut StaggerCounters,
    list_item: Duration,
    inline_code: Duration,
) {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };
        if element.tag == Tag::ListItem && in_fade_list {
            element.animation_delay = Some(list_item * counters.list_items);
            counters.list_items += 1;
        }
        if element.has_class(INLINE_CODE_CLASS) {
            element.animation_delay = Some(inline_code * counters.inline_code);
            element.add_class(FADE_IN_INLINE_CLASS);
            counters.inline_code += 1;
        }
        let child_in_list =
            in_fade_list || (element.tag == Tag::List && element.has_class(FADE_LIST_CLASS));
        stagger(&mut element.children, child_in_list, counters, list_item, inline_code);
    }
}

fn collect_code_blocks<'a>(nodes: &'a [Node], out: &mut Vec<&'a CodeBlock>) {
    for node in nodes {
        match node {
            Node::CodeBlock(block) => out.push(block),
            Node::Element(element) => collect_code_blocks(&element.children, out),
            Node::Text(_) => {}
        }
    }
}

fn code_blocks_mut(nodes: &mut [Node]) -> Vec<&mut CodeBlock> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            Node::CodeBlock(block) => out.push(block),
            Node::Element(element) => out.extend(code_blocks_mut(&mut element.children)),
            Node::Text(_) => {}
        }
    }
    out
}

/// Index of a message in the transcript
pub type MessageId = usize;

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) -> MessageId {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.get(id)
    }

    pub fn get_mut(&mut self, id: MessageId) -> Option<&mut ChatMessage> {
        self.messages.get_mut(id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// All code blocks across the transcript, oldest first, with their owner
    pub fn code_block_locations(&self) -> Vec<(MessageId, usize)> {
        self.messages
            .iter()
            .enumerate()
            .flat_map(|(id, message)| (0..message.code_blocks().len()).map(move |i| (id, i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown;

    #[test]
    fn test_text_goes_into_open_paragraph() {
        let mut message = ChatMessage::new(Sender::Ai);
        message.start_paragraph();
        message.append_text("H");
        message.append_text("i");
        message.end_paragraph();
        message.append_node(Node::CodeBlock(CodeBlock::build("x", "py")));

        assert_eq!(message.content.len(), 2);
        match &message.content[0] {
            Node::Element(p) => {
                assert_eq!(p.tag, Tag::Paragraph);
                assert_eq!(p.children, vec![Node::Text("Hi".to_string())]);
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
        assert_eq!(message.code_blocks().len(), 1);
    }

    #[test]
    fn test_clear_drops_content() {
        let mut message = ChatMessage::user("hello");
        message.clear();
        assert!(message.content.is_empty());
        assert_eq!(message.text(), "");
    }

    #[test]
    fn test_entrance_delays_cascade() {
        let markup = markdown::format("Use `a` then `b`:\n- one\n- two\n- three");
        let mut message = ChatMessage::ai_markup(&markup);
        message.set_entrance_delays(Duration::from_millis(100), Duration::from_millis(50));

        let mut list_delays = Vec::new();
        let mut code_delays = Vec::new();
        fn walk(nodes: &[Node], list: &mut Vec<Duration>, code: &mut Vec<Duration>) {
            for node in nodes {
                if let Node::Element(el) = node {
                    match el.tag {
                        Tag::ListItem => list.extend(el.animation_delay),
                        Tag::Code => {
                            assert!(el.has_class(FADE_IN_INLINE_CLASS));
                            code.extend(el.animation_delay);
                        }
                        _ => {}
                    }
                    walk(&el.children, list, code);
                }
            }
        }
        walk(&message.content, &mut list_delays, &mut code_delays);

        assert_eq!(
            list_delays,
            vec![Duration::ZERO, Duration::from_millis(100), Duration::from_millis(200)]
        );
        assert_eq!(code_delays, vec![Duration::ZERO, Duration::from_millis(50)]);
        assert!(message.settled_at.is_some());
    }

    #[test]
    fn test_code_block_locations() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("hi"));
        let mut reply = ChatMessage::new(Sender::Ai);
        reply.append_node(Node::CodeBlock(CodeBlock::build("a", "sh")));
        reply.append_node(Node::CodeBlock(CodeBlock::build("b", "sh")));
        let id = transcript.push(reply);

        assert_eq!(transcript.code_block_locations(), vec![(id, 0), (id, 1)]);
        let block = transcript.get_mut(id).and_then(|m| m.code_block_mut(1)).unwrap();
        assert_eq!(block.code(), "b");
    }
}
