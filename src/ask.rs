//! One-shot mode: answer a single prompt on stdout

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::*;
use maxchat_core::code_block::HighlightKind;
use maxchat_core::conversation::THINKING_CLASS;
use maxchat_core::{
    Backend, CodeBlock, Config, Element, Highlighter, Node, Outcome, Pacer, Pacing, ReplyRenderer,
    Responder, SessionStore, Sink, Tag,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Writes rendered output straight to a terminal or pipe
pub struct StdoutSink<W: Write> {
    out: W,
    /// Nothing can be taken back once printed, so the thinking line is
    /// only erased when the output is a terminal
    interactive: bool,
    thinking_shown: bool,
}

impl<W: Write> StdoutSink<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            interactive,
            thinking_shown: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        // Broken pipes are not worth failing a reply over
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn element_text(element: &Element) -> String {
        let inner: String = element.children.iter().map(Self::node_text).collect();
        match element.tag {
            Tag::Strong => inner.bold().to_string(),
            Tag::Emphasis => inner.italic().to_string(),
            Tag::Code => inner.green().to_string(),
            Tag::Link => match &element.href {
                Some(href) if href != &inner => format!("{} ({})", inner.underline().blue(), href.dimmed()),
                _ => inner.underline().blue().to_string(),
            },
            Tag::LineBreak => "\n".to_string(),
            Tag::List => format!("\n{}", inner),
            Tag::ListItem => format!("  • {}\n", inner),
            Tag::Paragraph | Tag::Span => inner,
        }
    }

    fn node_text(node: &Node) -> String {
        match node {
            Node::Text(text) => text.clone(),
            Node::Element(element) => Self::element_text(element),
            Node::CodeBlock(block) => Self::code_block_text(block),
        }
    }

    fn code_block_text(block: &CodeBlock) -> String {
        let mut text = format!("\n{}\n", format!(" {} ", block.label()).black().on_magenta());
        for line in Self::code_lines(block) {
            text.push_str(&format!("  {} {}\n", "│".dimmed(), line));
        }
        text
    }

    /// Coloured code split into lines; a span crossing a newline is painted on both sides
    fn code_lines(block: &CodeBlock) -> Vec<String> {
        let code = block.code();
        let mut pieces: Vec<(&str, Option<HighlightKind>)> = Vec::new();
        let mut pos = 0;
        for span in block.highlights() {
            if span.range.start < pos {
                continue;
            }
            pieces.push((&code[pos..span.range.start], None));
            pieces.push((&code[span.range.clone()], Some(span.kind)));
            pos = span.range.end;
        }
        pieces.push((&code[pos..], None));

        let mut lines = Vec::new();
        let mut current = String::new();
        for (piece, kind) in pieces {
            for (i, part) in piece.split('\n').enumerate() {
                if i > 0 {
                    lines.push(std::mem::take(&mut current));
                }
                if part.is_empty() {
                    continue;
                }
                let painted = match kind {
                    Some(HighlightKind::Keyword) => part.magenta(),
                    Some(HighlightKind::String) => part.yellow(),
                    Some(HighlightKind::Comment) => part.dimmed(),
                    Some(HighlightKind::Number) => part.cyan(),
                    None => part.green(),
                };
                current.push_str(&painted.to_string());
            }
        }
        lines.push(current);
        lines
    }
}

impl<W: Write> Sink for StdoutSink<W> {
    fn append_text(&mut self, text: &str) {
        self.write(text);
    }

    fn append_node(&mut self, node: Node) {
        if let Node::Element(element) = &node {
            if element.has_class(THINKING_CLASS) {
                if self.interactive {
                    self.thinking_shown = true;
                    let line = format!("{} Thinking...", element.text()).dimmed().to_string();
                    self.write(&line);
                }
                return;
            }
        }
        let text = Self::node_text(&node);
        self.write(&text);
    }

    fn start_paragraph(&mut self) {}

    fn end_paragraph(&mut self) {
        self.write("\n");
    }

    fn clear(&mut self) {
        if self.thinking_shown {
            self.thinking_shown = false;
            self.write("\r\x1b[2K");
        }
    }

    fn set_entrance_delays(&mut self, _list_item: Duration, _inline_code: Duration) {}
}

pub async fn run(
    backend: Arc<dyn Backend>,
    highlighter: Arc<dyn Highlighter>,
    store: &SessionStore,
    config: &Config,
    prompt: &str,
) -> Result<Outcome> {
    let session = store.load()?;
    let interactive = io::stdout().is_terminal();

    // Typing effect only makes sense on a terminal
    let pacing = if interactive {
        Pacing {
            char_delay: config.char_delay(),
            ..Pacing::default()
        }
    } else {
        Pacing::instant()
    };

    let renderer = ReplyRenderer::new(StdRng::from_entropy(), Pacer::default())
        .with_pacing(pacing)
        .with_highlighter(highlighter);
    let mut responder = Responder::new(backend, session, renderer);
    let mut sink = StdoutSink::new(io::stdout(), interactive);

    let outcome = responder.respond(prompt, &mut sink).await?;
    sink.append_text("\n");
    tracing::info!(?outcome, "one-shot reply finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxchat_core::conversation::thinking_indicator;
    use maxchat_core::markup;

    fn rendered(markup_text: &str) -> String {
        colored::control::set_override(false);
        let mut sink = StdoutSink::new(Vec::new(), false);
        for node in markup::parse(markup_text) {
            sink.append_node(node);
        }
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_list_renders_as_plain_text() {
        assert_eq!(
            rendered(r#"Picks:<ul class="fade-list"><li>Heat</li><li>Ronin</li></ul>"#),
            "Picks:\n  • Heat\n  • Ronin\n"
        );
    }

    #[test]
    fn test_thinking_hidden_when_not_interactive() {
        let mut sink = StdoutSink::new(Vec::new(), false);
        sink.append_node(thinking_indicator());
        sink.clear();
        sink.append_text("hi");
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "hi");
    }

    #[test]
    fn test_code_block_lines() {
        colored::control::set_override(false);
        let mut sink = StdoutSink::new(Vec::new(), false);
        sink.append_node(Node::CodeBlock(CodeBlock::build("a\nb", "sh")));
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "\n SH \n  │ a\n  │ b\n");
    }

    #[test]
    fn test_highlighted_block_keeps_text() {
        struct CommentHighlighter;

        impl Highlighter for CommentHighlighter {
            fn highlight(&self, _language: &str, _code: &str) -> Vec<maxchat_core::code_block::HighlightSpan> {
                vec![maxchat_core::code_block::HighlightSpan {
                    range: 2..8,
                    kind: HighlightKind::Comment,
                }]
            }
        }

        colored::control::set_override(false);
        let mut sink = StdoutSink::new(Vec::new(), false);
        let block = CodeBlock::build_with("x # one\n# two\ny", "py", Some(&CommentHighlighter));
        sink.append_node(Node::CodeBlock(block));
        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "\n PY \n  │ x # one\n  │ # two\n  │ y\n"
        );
    }
}
