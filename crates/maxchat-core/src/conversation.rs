//! One exchange: prompt in, rendered reply out
//!
//! Canned answers short-circuit everything else. Otherwise a thinking
//! indicator is shown, the backend is called, and the reply (or an error
//! line) replaces the indicator.

use std::sync::Arc;

use rand::Rng;

use crate::client::Backend;
use crate::error::{GenerateError, NO_RESPONSE_MESSAGE};
use crate::intercept::{intercept, Topic};
use crate::markup::{Element, Node, Tag};
use crate::render::ReplyRenderer;
use crate::session::Session;
use crate::sink::Sink;
use crate::typewriter::{animate, Cancelled};

pub const GREETING: &str = "🍿 Hey! Which movie or series can I help you with, or do you need ideas?";

pub const THINKING_CLASS: &str = "thinking";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Canned(Topic),
    Replied,
    EmptyReply,
    StatusError(u16),
    NetworkFailure,
}

pub fn thinking_indicator() -> Node {
    Node::Element(Element::new(Tag::Span).with_class(THINKING_CLASS).with_text("🧠"))
}

pub struct Responder<R> {
    backend: Arc<dyn Backend>,
    session: Session,
    renderer: ReplyRenderer<R>,
}

impl<R: Rng> Responder<R> {
    pub fn new(backend: Arc<dyn Backend>, session: Session, renderer: ReplyRenderer<R>) -> Self {
        Self {
            backend,
            session,
            renderer,
        }
    }

    /// Answer `prompt` into `target`, the (empty) assistant message
    pub async fn respond<S: Sink + ?Sized>(&mut self, prompt: &str, target: &mut S) -> Result<Outcome, Cancelled> {
        if let Some(canned) = intercept(prompt) {
            tracing::info!(topic = ?canned.topic, "answering with canned reply");
            let char_delay = self.renderer.pacing().char_delay;
            animate(&mut *target, canned.markup, char_delay, self.renderer.pacer()).await?;
            return Ok(Outcome::Canned(canned.topic));
        }

        target.append_node(thinking_indicator());
        target.scroll_to_bottom();
        self.renderer.think().await?;

        let pacer = self.renderer.pacer().clone();
        let result = tokio::select! {
            _ = pacer.token().cancelled() => return Err(Cancelled),
            result = self.backend.generate(&self.session, prompt) => result,
        };
        target.clear();

        match result {
            Ok(reply) => {
                self.renderer.render(&mut *target, &reply).await?;
                Ok(Outcome::Replied)
            }
            Err(GenerateError::EmptyReply) => {
                tracing::warn!("backend response carried no reply");
                self.renderer.render(&mut *target, NO_RESPONSE_MESSAGE).await?;
                Ok(Outcome::EmptyReply)
            }
            Err(err) => {
                let outcome = match &err {
                    GenerateError::Status { status, .. } => Outcome::StatusError(*status),
                    _ => {
                        tracing::error!(error = %err, "generation request failed");
                        Outcome::NetworkFailure
                    }
                };
                target.append_text(&err.transcript_text());
                target.scroll_to_bottom();
                Ok(outcome)
            }
        }
    }
}
