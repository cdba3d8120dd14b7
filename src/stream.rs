//! Render steps sent from a reply task to the UI loop
//!
//! The reply task owns no UI state. It drives a [`ChannelSink`], and the event
//! loop replays each step onto the transcript message it belongs to.

use std::time::Duration;

use maxchat_core::{ChatMessage, MessageId, Node, Sink};
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::AppEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Text(String),
    Node(Node),
    StartParagraph,
    EndParagraph,
    Clear,
    EntranceDelays {
        list_item: Duration,
        inline_code: Duration,
    },
    ScrollToBottom,
}

impl RenderOp {
    /// Apply the step to `message`. Returns true when the view should follow
    /// the bottom of the transcript.
    pub fn apply(self, message: &mut ChatMessage) -> bool {
        match self {
            RenderOp::Text(text) => message.append_text(&text),
            RenderOp::Node(node) => message.append_node(node),
            RenderOp::StartParagraph => message.start_paragraph(),
            RenderOp::EndParagraph => message.end_paragraph(),
            RenderOp::Clear => message.clear(),
            RenderOp::EntranceDelays {
                list_item,
                inline_code,
            } => message.set_entrance_delays(list_item, inline_code),
            RenderOp::ScrollToBottom => return true,
        }
        false
    }
}

pub struct ChannelSink {
    epoch: u64,
    message: MessageId,
    tx: UnboundedSender<AppEvent>,
}

impl ChannelSink {
    pub fn new(epoch: u64, message: MessageId, tx: UnboundedSender<AppEvent>) -> Self {
        Self { epoch, message, tx }
    }

    fn send(&mut self, op: RenderOp) {
        // The loop only goes away on shutdown
        let _ = self.tx.send(AppEvent::Render {
            epoch: self.epoch,
            message: self.message,
            op,
        });
    }
}

impl Sink for ChannelSink {
    fn append_text(&mut self, text: &str) {
        self.send(RenderOp::Text(text.to_string()));
    }

    fn append_node(&mut self, node: Node) {
        self.send(RenderOp::Node(node));
    }

    fn start_paragraph(&mut self) {
        self.send(RenderOp::StartParagraph);
    }

    fn end_paragraph(&mut self) {
        self.send(RenderOp::EndParagraph);
    }

    fn clear(&mut self) {
        self.send(RenderOp::Clear);
    }

    fn set_entrance_delays(&mut self, list_item: Duration, inline_code: Duration) {
        self.send(RenderOp::EntranceDelays {
            list_item,
            inline_code,
        });
    }

    fn scroll_to_bottom(&mut self) {
        self.send(RenderOp::ScrollToBottom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxchat_core::{Pacer, Pacing, ReplyRenderer, Sender};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_replayed_steps_match_direct_render() {
        let reply = "Try **Heat**. Then:\n- Ronin\n- Thief\n```rust\nfn main() {}\n```";
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut direct = ChatMessage::new(Sender::Ai);
        ReplyRenderer::new(StdRng::seed_from_u64(9), Pacer::default())
            .with_pacing(Pacing::instant())
            .render(&mut direct, reply)
            .await
            .unwrap();

        let mut sink = ChannelSink::new(3, 1, tx);
        ReplyRenderer::new(StdRng::seed_from_u64(9), Pacer::default())
            .with_pacing(Pacing::instant())
            .render(&mut sink, reply)
            .await
            .unwrap();
        drop(sink);

        let mut replayed = ChatMessage::new(Sender::Ai);
        let mut followed = false;
        while let Some(event) = rx.recv().await {
            match event {
                AppEvent::Render { epoch, message, op } => {
                    assert_eq!((epoch, message), (3, 1));
                    followed |= op.apply(&mut replayed);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }

        assert!(followed);
        assert_eq!(replayed.content, direct.content);
        assert_eq!(replayed.code_blocks()[0].label(), "RUST");
    }

    #[test]
    fn test_clear_op_resets_message() {
        let mut message = ChatMessage::new(Sender::Ai);
        RenderOp::Text("🧠".to_string()).apply(&mut message);
        assert!(!RenderOp::Clear.apply(&mut message));
        assert!(message.content.is_empty());
    }
}
