//! Render targets
//!
//! The animator and renderer never touch a screen directly. They append to a
//! [`Sink`]: a chat message in memory, a channel feeding the terminal UI, or
//! stdout for one-shot use.

use std::time::Duration;

use crate::markup::Node;

pub trait Sink {
    /// Append text (one grapheme at a time while animating)
    fn append_text(&mut self, text: &str);

    /// Append a whole node without animation
    fn append_node(&mut self, node: Node);

    /// Open a paragraph; appends go into it until [`Sink::end_paragraph`]
    fn start_paragraph(&mut self);

    fn end_paragraph(&mut self);

    /// Drop everything appended so far
    fn clear(&mut self);

    /// Cascade entrance animations: the n-th list item waits `list_item * n`,
    /// the n-th inline code span waits `inline_code * n`.
    fn set_entrance_delays(&mut self, list_item: Duration, inline_code: Duration);

    fn scroll_to_bottom(&mut self) {}
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn append_text(&mut self, text: &str) {
        (**self).append_text(text)
    }

    fn append_node(&mut self, node: Node) {
        (**self).append_node(node)
    }

    fn start_paragraph(&mut self) {
        (**self).start_paragraph()
    }

    fn end_paragraph(&mut self) {
        (**self).end_paragraph()
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn set_entrance_delays(&mut self, list_item: Duration, inline_code: Duration) {
        (**self).set_entrance_delays(list_item, inline_code)
    }

    fn scroll_to_bottom(&mut self) {
        (**self).scroll_to_bottom()
    }
}
