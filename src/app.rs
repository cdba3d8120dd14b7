use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use maxchat_core::{
    Backend, Cancelled, ChatMessage, Clipboard, Config, Highlighter, MessageId, Outcome, Pacer,
    Pacing, ReplyRenderer, Responder, Session, SessionStore, Transcript, GREETING,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::stream::{ChannelSink, RenderOp};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(anyhow!("unknown theme: {}", other)),
        }
    }
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Icon for the toggle: what you get if you press it
    pub fn toggle_icon(&self) -> &'static str {
        match self {
            Theme::Dark => "☀️",
            Theme::Light => "🌙",
        }
    }
}

/// The reply task currently writing into the transcript
pub struct PendingReply {
    pub message: MessageId,
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub theme: Theme,
    pub show_clear_confirm: bool,
    pub status: Option<String>,

    // Conversation
    pub transcript: Transcript,
    pub session: Session,
    store: SessionStore,
    backend: Arc<dyn Backend>,
    pacing: Pacing,
    highlighter: Option<Arc<dyn Highlighter>>,
    pub pending: Option<PendingReply>,
    /// Bumped on every clear; render steps from older replies are dropped
    pub epoch: u64,

    // Input state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat view
    pub scroll: u16,
    pub max_scroll: u16,
    pub follow: bool,
    pub chat_height: u16,
    pub selected_block: Option<usize>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    clipboard: Box<dyn Clipboard>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        backend: Arc<dyn Backend>,
        store: SessionStore,
        config: &Config,
        clipboard: Box<dyn Clipboard>,
        events: UnboundedSender<AppEvent>,
    ) -> Result<Self> {
        let session = store.load()?;
        tracing::info!(user_id = %session.user_id, project = %session.project, "session loaded");

        let theme = config
            .theme
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or_default();

        let pacing = Pacing {
            char_delay: config.char_delay(),
            ..Pacing::default()
        };

        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::ai_markup(GREETING));

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            theme,
            show_clear_confirm: false,
            status: None,

            transcript,
            session,
            store,
            backend,
            pacing,
            highlighter: None,
            pending: None,
            epoch: 0,

            input: String::new(),
            cursor: 0,

            scroll: 0,
            max_scroll: 0,
            follow: true,
            chat_height: 0,
            selected_block: None,

            animation_frame: 0,

            clipboard,
            events,
        })
    }

    /// Colour code blocks in replies that arrive from now on
    pub fn with_highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    pub fn is_replying(&self) -> bool {
        self.pending.is_some()
    }

    /// Send whatever is in the input box
    pub fn submit(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }

        if let Some(rest) = text.strip_prefix("/project") {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                self.set_project(rest.trim());
                self.take_input();
                return;
            }
        }

        // One reply at a time
        if self.is_replying() {
            self.status = Some("Still answering, wait for the reply to finish".to_string());
            return;
        }

        self.take_input();
        self.status = None;
        self.start_reply(text);
    }

    fn take_input(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.input)
    }

    fn start_reply(&mut self, prompt: String) {
        self.transcript.push(ChatMessage::user(&prompt));
        let message = self.transcript.push(ChatMessage::new(maxchat_core::Sender::Ai));
        self.follow = true;

        let cancel = CancellationToken::new();
        let mut renderer = ReplyRenderer::new(StdRng::from_entropy(), Pacer::new(cancel.clone()))
            .with_pacing(self.pacing.clone());
        if let Some(highlighter) = &self.highlighter {
            renderer = renderer.with_highlighter(highlighter.clone());
        }
        let mut responder = Responder::new(self.backend.clone(), self.session.clone(), renderer);

        let epoch = self.epoch;
        let tx = self.events.clone();
        tracing::info!(message_id = message, project = %self.session.project, "sending prompt");

        let task = tokio::spawn(async move {
            let mut sink = ChannelSink::new(epoch, message, tx.clone());
            let outcome = responder.respond(&prompt, &mut sink).await;
            let _ = tx.send(AppEvent::ReplyDone {
                epoch,
                message,
                outcome,
            });
        });

        self.pending = Some(PendingReply {
            message,
            cancel,
            task,
        });
    }

    /// Replay one step of a reply onto its message
    pub fn apply_render(&mut self, epoch: u64, message: MessageId, op: RenderOp) {
        if epoch != self.epoch {
            return;
        }
        if let Some(target) = self.transcript.get_mut(message) {
            if op.apply(target) {
                self.follow = true;
            }
        }
    }

    pub fn finish_reply(&mut self, epoch: u64, message: MessageId, outcome: Result<Outcome, Cancelled>) {
        if epoch != self.epoch {
            return;
        }
        match &outcome {
            Ok(outcome) => tracing::info!(message_id = message, ?outcome, "reply finished"),
            Err(Cancelled) => tracing::debug!(message_id = message, "reply cancelled"),
        }
        if self.pending.as_ref().is_some_and(|p| p.message == message) {
            self.pending = None;
        }
    }

    fn cancel_reply(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
            tracing::debug!(message_id = pending.message, finished = pending.task.is_finished(), "cancelling reply");
        }
    }

    /// Wipe the transcript, forget the project, greet again
    pub fn clear_history(&mut self) {
        self.show_clear_confirm = false;
        self.cancel_reply();
        self.epoch += 1;

        self.transcript.clear();
        if let Err(e) = self.store.clear_project(&mut self.session) {
            tracing::error!(error = %e, "failed to clear persisted project");
            self.status = Some(format!("Could not save session: {}", e));
        } else {
            self.status = None;
        }
        self.transcript.push(ChatMessage::ai_markup(GREETING));

        self.selected_block = None;
        self.follow = true;
        self.scroll = 0;
        tracing::info!("chat history cleared");
    }

    pub fn set_project(&mut self, name: &str) {
        if name.is_empty() {
            self.status = Some(format!("Project: {}", self.session.project));
            return;
        }
        match self.store.set_project(&mut self.session, name) {
            Ok(()) => {
                tracing::info!(project = %name, "project changed");
                self.status = Some(format!("Project set to {}", name));
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to persist project");
                self.status = Some(format!("Could not save project: {}", e));
            }
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(e) = Config::save_theme(self.theme.as_str()) {
            tracing::warn!(error = %e, "failed to persist theme");
        }
    }

    // Code block selection
    pub fn select_next_block(&mut self) {
        let count = self.transcript.code_block_locations().len();
        if count == 0 {
            return;
        }
        self.selected_block = Some(match self.selected_block {
            Some(i) => (i + 1).min(count - 1),
            None => 0,
        });
    }

    pub fn select_prev_block(&mut self) {
        let count = self.transcript.code_block_locations().len();
        if count == 0 {
            return;
        }
        self.selected_block = Some(match self.selected_block {
            Some(i) => i.saturating_sub(1),
            None => count - 1,
        });
    }

    /// Copy the selected code block, or the newest one when nothing is selected
    pub fn copy_selected_block(&mut self) {
        let locations = self.transcript.code_block_locations();
        let index = match self.selected_block {
            Some(i) if i < locations.len() => i,
            _ if !locations.is_empty() => locations.len() - 1,
            _ => {
                self.status = Some("No code to copy".to_string());
                return;
            }
        };
        self.selected_block = Some(index);

        let (message, block) = locations[index];
        let Some(block) = self
            .transcript
            .get_mut(message)
            .and_then(|m| m.code_block_mut(block))
        else {
            return;
        };
        if let Err(e) = block.copy(self.clipboard.as_mut(), Instant::now()) {
            tracing::warn!(error = %e, "copy failed");
            self.status = Some(format!("Copy failed: {}", e));
        }
    }

    // Chat scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll);
        self.follow = self.scroll >= self.max_scroll;
    }

    pub fn page_size(&self) -> u16 {
        self.chat_height.saturating_sub(2).max(1)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_replying() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn shutdown(&mut self) {
        self.cancel_reply();
    }
}
