//! Reply rendering: segment, format, animate
//!
//! Prose segments are formatted and typed out sentence by sentence with a
//! short random pause between sentences. Code segments become code blocks
//! and appear at once. Randomness is injected so tests can pin it down.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::code_block::{CodeBlock, Highlighter};
use crate::markdown;
use crate::markup::Node;
use crate::segment::{segments, sentences, ReplySegment};
use crate::sink::Sink;
use crate::typewriter::{animate, Cancelled, Pacer, DEFAULT_CHAR_DELAY};

pub const REACTIONS: [&str; 7] = ["😅", "😂", "💡", "🔥", "🚀", "😎", "🙌"];

pub const LIST_ITEM_STAGGER: Duration = Duration::from_millis(100);
pub const INLINE_CODE_STAGGER: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    pub char_delay: Duration,
    /// Pause after each sentence, in milliseconds
    pub sentence_pause_ms: Range<u64>,
    /// Chance of a reaction emoji after a paragraph
    pub reaction_chance: f64,
    /// "Thinking" delay before the request goes out, in milliseconds
    pub thinking_ms: Range<u64>,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            char_delay: DEFAULT_CHAR_DELAY,
            sentence_pause_ms: 150..400,
            reaction_chance: 0.10,
            thinking_ms: 800..1400,
        }
    }
}

impl Pacing {
    /// No waits at all, for one-shot output that is not a terminal
    pub fn instant() -> Self {
        Self {
            char_delay: Duration::ZERO,
            sentence_pause_ms: 0..1,
            reaction_chance: 0.0,
            thinking_ms: 0..1,
        }
    }
}

pub struct ReplyRenderer<R> {
    rng: R,
    pacing: Pacing,
    pacer: Pacer,
    highlighter: Option<Arc<dyn Highlighter>>,
}

impl<R: Rng> ReplyRenderer<R> {
    pub fn new(rng: R, pacer: Pacer) -> Self {
        Self {
            rng,
            pacing: Pacing::default(),
            pacer,
            highlighter: None,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Wait out the artificial "thinking" delay
    pub async fn think(&mut self) -> Result<(), Cancelled> {
        let ms = self.sample(self.pacing.thinking_ms.clone());
        self.pacer.pause(Duration::from_millis(ms)).await
    }

    /// Render a raw reply into `target`. Segments and sentences appear strictly
    /// in order; returns once the last segment has been appended.
    pub async fn render<S: Sink + ?Sized>(&mut self, target: &mut S, reply: &str) -> Result<(), Cancelled> {
        for segment in segments(reply) {
            match segment {
                ReplySegment::Prose(text) => self.render_prose(&mut *target, &text).await?,
                ReplySegment::Code { language, code } => {
                    self.pacer.check()?;
                    let block = CodeBlock::build_with(&code, &language, self.highlighter.as_deref());
                    target.append_node(Node::CodeBlock(block));
                }
            }
            target.scroll_to_bottom();
        }

        target.set_entrance_delays(LIST_ITEM_STAGGER, INLINE_CODE_STAGGER);
        Ok(())
    }

    async fn render_prose<S: Sink + ?Sized>(&mut self, target: &mut S, text: &str) -> Result<(), Cancelled> {
        // Terminals keep the whitespace around fences that HTML would collapse
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let formatted = markdown::format(text);
        target.start_paragraph();

        for sentence in sentences(&formatted) {
            if sentence.is_empty() {
                continue;
            }
            animate(&mut *target, &format!("{sentence} "), self.pacing.char_delay, &self.pacer).await?;
            target.scroll_to_bottom();

            let pause = self.sample(self.pacing.sentence_pause_ms.clone());
            self.pacer.pause(Duration::from_millis(pause)).await?;
        }

        if self.rng.gen::<f64>() < self.pacing.reaction_chance {
            let emoji = REACTIONS[self.rng.gen_range(0..REACTIONS.len())];
            target.append_text(&format!(" {emoji}"));
        }

        target.end_paragraph();
        Ok(())
    }

    fn sample(&mut self, range: Range<u64>) -> u64 {
        if range.is_empty() {
            range.start
        } else {
            self.rng.gen_range(range)
        }
    }
}
