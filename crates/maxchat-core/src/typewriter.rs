//! Typewriter animation
//!
//! Text nodes are revealed one grapheme cluster at a time so emoji and other
//! multi-codepoint characters appear as a single step. Every other node is
//! appended whole. Each wait is a suspension point that a [`Pacer`] can cancel.
//!
//! The target is borrowed mutably for the whole animation, so two animations
//! can never interleave on the same sink.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use unicode_segmentation::UnicodeSegmentation;

use crate::markup::{self, Node};
use crate::sink::Sink;

pub const DEFAULT_CHAR_DELAY: Duration = Duration::from_millis(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rendering was cancelled")]
pub struct Cancelled;

/// Cancellable delay primitive shared by everything that animates one reply
#[derive(Debug, Clone, Default)]
pub struct Pacer {
    cancel: CancellationToken,
}

impl Pacer {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    pub async fn pause(&self, duration: Duration) -> Result<(), Cancelled> {
        self.check()?;
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

/// Reveal `markup` into `target`, waiting `char_delay` after every grapheme
pub async fn animate<S: Sink + ?Sized>(
    target: &mut S,
    markup: &str,
    char_delay: Duration,
    pacer: &Pacer,
) -> Result<(), Cancelled> {
    for node in markup::parse(markup) {
        match node {
            Node::Text(text) => {
                for grapheme in text.graphemes(true) {
                    pacer.check()?;
                    target.append_text(grapheme);
                    target.scroll_to_bottom();
                    pacer.pause(char_delay).await?;
                }
            }
            other => {
                pacer.check()?;
                target.append_node(other);
                target.scroll_to_bottom();
            }
        }
    }
    Ok(())
}
