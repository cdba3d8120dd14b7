pub mod client;
pub mod code_block;
pub mod config;
pub mod conversation;
pub mod error;
pub mod intercept;
pub mod markdown;
pub mod markup;
pub mod render;
pub mod segment;
pub mod session;
pub mod sink;
pub mod transcript;
pub mod typewriter;

// Re-export main types for convenience
pub use client::{Backend, GenerateClient};
pub use code_block::{Clipboard, CodeBlock, Highlighter};
pub use config::Config;
pub use conversation::{Outcome, Responder, GREETING};
pub use error::GenerateError;
pub use intercept::{intercept, CannedReply, Topic};
pub use markup::{Element, Node, Tag};
pub use render::{Pacing, ReplyRenderer};
pub use segment::{segments, ReplySegment};
pub use session::{Session, SessionStore};
pub use sink::Sink;
pub use transcript::{ChatMessage, MessageId, Sender, Transcript};
pub use typewriter::{animate, Cancelled, Pacer};
