//! Code blocks: a language label, a copy action and the code itself

use std::ops::Range;
use std::time::{Duration, Instant};

use anyhow::Result;

pub const DEFAULT_LANGUAGE: &str = "plaintext";
pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";

/// How long "Copied!" stays up before the button reverts
pub const COPY_FEEDBACK: Duration = Duration::from_millis(1500);

/// Destination for the copy action
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    Keyword,
    String,
    Comment,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    /// Byte range into [`CodeBlock::code`]
    pub range: Range<usize>,
    pub kind: HighlightKind,
}

/// Optional syntax highlighting collaborator
pub trait Highlighter: Send + Sync {
    fn highlight(&self, language: &str, code: &str) -> Vec<HighlightSpan>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    language: String,
    code: String,
    highlights: Vec<HighlightSpan>,
    copied_at: Option<Instant>,
}

impl CodeBlock {
    /// Build a block from raw code. The stored (displayed and copied) text is
    /// trimmed; an empty language falls back to `plaintext`.
    pub fn build(code: &str, language: &str) -> Self {
        let language = language.trim();
        Self {
            language: if language.is_empty() {
                DEFAULT_LANGUAGE.to_string()
            } else {
                language.to_string()
            },
            code: code.trim().to_string(),
            highlights: Vec::new(),
            copied_at: None,
        }
    }

    pub fn build_with(code: &str, language: &str, highlighter: Option<&dyn Highlighter>) -> Self {
        let mut block = Self::build(code, language);
        if let Some(highlighter) = highlighter {
            block.highlights = highlighter
                .highlight(&block.language, &block.code)
                .into_iter()
                .filter(|span| span.range.end <= block.code.len() && span.range.start < span.range.end)
                .collect();
        }
        block
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Header label, e.g. `PY`
    pub fn label(&self) -> String {
        self.language.to_uppercase()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn highlights(&self) -> &[HighlightSpan] {
        &self.highlights
    }

    /// Copy the code and start the "Copied!" feedback window
    pub fn copy(&mut self, clipboard: &mut dyn Clipboard, now: Instant) -> Result<()> {
        clipboard.write_text(&self.code)?;
        self.copied_at = Some(now);
        tracing::debug!(language = %self.language, bytes = self.code.len(), "copied code block");
        Ok(())
    }

    pub fn copy_label(&self, now: Instant) -> &'static str {
        match self.copied_at {
            Some(at) if now.saturating_duration_since(at) < COPY_FEEDBACK => COPIED_LABEL,
            _ => COPY_LABEL,
        }
    }
}
