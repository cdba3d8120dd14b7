//! Turns transcript messages into styled terminal lines

use std::time::{Duration, Instant};

use maxchat_core::code_block::{HighlightKind, HighlightSpan};
use maxchat_core::conversation::THINKING_CLASS;
use maxchat_core::{ChatMessage, CodeBlock, Element, Node, Sender, Tag};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::app::Theme;

/// How long an element stays dimmed after its entrance delay
const FADE_DURATION: Duration = Duration::from_millis(400);

const GLOW_CLASS: &str = "glow";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: Color,
    pub user: Color,
    pub ai: Color,
    pub accent: Color,
    pub code: Color,
    pub link: Color,
    pub muted: Color,
    pub copied: Color,
    pub keyword: Color,
    pub string: Color,
    pub comment: Color,
    pub number: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                text: Color::White,
                user: Color::Cyan,
                ai: Color::Yellow,
                accent: Color::Magenta,
                code: Color::LightGreen,
                link: Color::LightBlue,
                muted: Color::DarkGray,
                copied: Color::Green,
                keyword: Color::LightMagenta,
                string: Color::LightYellow,
                comment: Color::DarkGray,
                number: Color::LightCyan,
            },
            Theme::Light => Self {
                text: Color::Black,
                user: Color::Blue,
                ai: Color::Red,
                accent: Color::Magenta,
                code: Color::Green,
                link: Color::Blue,
                muted: Color::Gray,
                copied: Color::Green,
                keyword: Color::Magenta,
                string: Color::Red,
                comment: Color::Gray,
                number: Color::Cyan,
            },
        }
    }

    fn highlight(&self, kind: HighlightKind) -> Color {
        match kind {
            HighlightKind::Keyword => self.keyword,
            HighlightKind::String => self.string,
            HighlightKind::Comment => self.comment,
            HighlightKind::Number => self.number,
        }
    }
}

pub struct ViewContext {
    pub palette: Palette,
    pub now: Instant,
    pub animation_frame: u8,
    /// Selected code block, as an index into this message's blocks
    pub selected_block: Option<usize>,
}

/// Label line, content, then a blank separator
pub fn message_lines(message: &ChatMessage, ctx: &ViewContext) -> Vec<Line<'static>> {
    let palette = ctx.palette;
    let (label, color) = match message.sender {
        Sender::User => ("You:", palette.user),
        Sender::Ai => ("AI:", palette.ai),
    };

    let mut writer = LineWriter::new(ctx, message.settled_at);
    writer.lines.push(Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));
    writer.nodes(&message.content, Style::default().fg(palette.text));
    writer.flush();
    writer.lines.push(Line::default());
    writer.lines
}

/// Rows `lines` occupy once wrapped at `width` columns
pub fn wrapped_height(lines: &[Line], width: u16) -> usize {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum()
}

struct LineWriter<'a> {
    ctx: &'a ViewContext,
    settled_at: Option<Instant>,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    block_index: usize,
}

impl<'a> LineWriter<'a> {
    fn new(ctx: &'a ViewContext, settled_at: Option<Instant>) -> Self {
        Self {
            ctx,
            settled_at,
            lines: Vec::new(),
            spans: Vec::new(),
            block_index: 0,
        }
    }

    fn break_line(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.spans)));
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.break_line();
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.break_line();
            }
            if !part.is_empty() {
                self.spans.push(Span::styled(part.to_string(), style));
            }
        }
    }

    fn nodes(&mut self, nodes: &[Node], style: Style) {
        for node in nodes {
            match node {
                Node::Text(text) => self.push_text(text, style),
                Node::Element(element) => self.element(element, style),
                Node::CodeBlock(block) => self.code_block(block),
            }
        }
    }

    fn element(&mut self, element: &Element, style: Style) {
        let palette = self.ctx.palette;
        let style = self.entrance(element, style);

        match element.tag {
            Tag::Strong => {
                let mut strong = style.add_modifier(Modifier::BOLD);
                if element.has_class(GLOW_CLASS) {
                    strong = strong.fg(palette.accent);
                }
                self.nodes(&element.children, strong);
            }
            Tag::Emphasis => self.nodes(&element.children, style.add_modifier(Modifier::ITALIC)),
            Tag::Code => self.nodes(&element.children, style.fg(palette.code)),
            Tag::Link => self.nodes(
                &element.children,
                style.fg(palette.link).add_modifier(Modifier::UNDERLINED),
            ),
            Tag::LineBreak => self.break_line(),
            Tag::Paragraph | Tag::List => {
                self.flush();
                self.nodes(&element.children, style);
                self.flush();
            }
            Tag::ListItem => {
                self.flush();
                self.spans.push(Span::styled("  • ", style.fg(palette.accent)));
                self.nodes(&element.children, style);
                self.flush();
            }
            Tag::Span if element.has_class(THINKING_CLASS) => {
                let dots = ".".repeat(self.ctx.animation_frame as usize + 1);
                self.push_text(
                    &format!("{} Thinking{}", element.text(), dots),
                    style.fg(palette.muted).add_modifier(Modifier::ITALIC),
                );
            }
            Tag::Span => self.nodes(&element.children, style),
        }
    }

    /// Dim an element until its staggered entrance has played
    fn entrance(&self, element: &Element, style: Style) -> Style {
        match (element.animation_delay, self.settled_at) {
            (Some(delay), Some(at)) if self.ctx.now < at + delay + FADE_DURATION => {
                style.add_modifier(Modifier::DIM)
            }
            _ => style,
        }
    }

    fn code_block(&mut self, block: &CodeBlock) {
        let palette = self.ctx.palette;
        let selected = self.ctx.selected_block == Some(self.block_index);
        self.block_index += 1;
        self.flush();

        let copy_label = block.copy_label(self.ctx.now);
        let copy_style = if copy_label == maxchat_core::code_block::COPIED_LABEL {
            Style::default().fg(palette.copied).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.muted)
        };
        self.lines.push(Line::from(vec![
            Span::styled(if selected { "▶ " } else { "  " }, Style::default().fg(palette.accent)),
            Span::styled(
                format!(" {} ", block.label()),
                Style::default().fg(Color::Black).bg(palette.accent).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(format!("[{}]", copy_label), copy_style),
        ]));

        let mut offset = 0;
        for line in block.code().split('\n') {
            let mut spans = vec![Span::styled("  │ ", Style::default().fg(palette.muted))];
            spans.extend(highlight_line(line, offset, block.highlights(), &palette));
            self.lines.push(Line::from(spans));
            offset += line.len() + 1;
        }
    }
}

/// Split one code line into spans by the highlight ranges that touch it
fn highlight_line(
    line: &str,
    start: usize,
    highlights: &[HighlightSpan],
    palette: &Palette,
) -> Vec<Span<'static>> {
    let plain = Style::default().fg(palette.code);
    let end = start + line.len();

    let mut touching: Vec<&HighlightSpan> = highlights
        .iter()
        .filter(|h| h.range.start < end && h.range.end > start)
        .collect();
    touching.sort_by_key(|h| h.range.start);

    let mut spans = Vec::new();
    let mut pos = start;
    for span in touching {
        let from = span.range.start.max(pos);
        let to = span.range.end.min(end);
        if from > pos {
            if let Some(text) = line.get(pos - start..from - start) {
                spans.push(Span::styled(text.to_string(), plain));
            }
        }
        if to > from {
            if let Some(text) = line.get(from - start..to - start) {
                spans.push(Span::styled(text.to_string(), Style::default().fg(palette.highlight(span.kind))));
            }
        }
        pos = pos.max(to);
    }
    if pos < end {
        if let Some(text) = line.get(pos - start..) {
            spans.push(Span::styled(text.to_string(), plain));
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxchat_core::code_block::Highlighter;
    use maxchat_core::conversation::thinking_indicator;
    use maxchat_core::{markdown, Sink};

    fn ctx() -> ViewContext {
        ViewContext {
            palette: Palette::for_theme(Theme::Dark),
            now: Instant::now(),
            animation_frame: 1,
            selected_block: None,
        }
    }

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_user_message() {
        let lines = message_lines(&ChatMessage::user("hi there"), &ctx());
        assert_eq!(plain(&lines), vec!["You:", "hi there", ""]);
    }

    #[test]
    fn test_list_items_get_bullets() {
        let message = ChatMessage::ai_markup(&markdown::format("Picks:\n- Heat\n- Ronin"));
        let lines = message_lines(&message, &ctx());
        assert_eq!(plain(&lines), vec!["AI:", "Picks:", "  • Heat", "  • Ronin", ""]);
    }

    #[test]
    fn test_line_break_and_bold() {
        let message = ChatMessage::ai_markup("I’m <strong>Max</strong><br>hello");
        let lines = message_lines(&message, &ctx());
        assert_eq!(plain(&lines), vec!["AI:", "I’m Max", "hello", ""]);
        assert!(lines[1].spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_thinking_indicator_animates() {
        let mut message = ChatMessage::new(Sender::Ai);
        message.append_node(thinking_indicator());
        let lines = message_lines(&message, &ctx());
        assert_eq!(plain(&lines)[1], "🧠 Thinking..");
    }

    struct KeywordHighlighter;

    impl Highlighter for KeywordHighlighter {
        fn highlight(&self, _language: &str, code: &str) -> Vec<HighlightSpan> {
            code.match_indices("fn")
                .map(|(i, m)| HighlightSpan {
                    range: i..i + m.len(),
                    kind: HighlightKind::Keyword,
                })
                .collect()
        }
    }

    #[test]
    fn test_code_block_header_and_highlights() {
        let mut message = ChatMessage::new(Sender::Ai);
        message.append_node(Node::CodeBlock(CodeBlock::build_with(
            "let a = 1;\nfn main() {}",
            "rust",
            Some(&KeywordHighlighter),
        )));
        let view = ViewContext {
            selected_block: Some(0),
            ..ctx()
        };

        let lines = message_lines(&message, &view);
        let text = plain(&lines);

        assert_eq!(text[1], "▶  RUST  [Copy]");
        assert_eq!(text[2], "  │ let a = 1;");
        assert_eq!(text[3], "  │ fn main() {}");
        assert_eq!(lines[3].spans[1].content, "fn");
        assert_eq!(lines[3].spans[1].style.fg, Some(view.palette.keyword));
    }

    #[test]
    fn test_staggered_items_start_dimmed() {
        let mut message = ChatMessage::ai_markup(&markdown::format("- a\n- b"));
        message.set_entrance_delays(Duration::from_millis(100), Duration::from_millis(50));
        let view = ctx();
        let lines = message_lines(&message, &view);
        assert!(lines[1].spans[0].style.add_modifier.contains(Modifier::DIM));

        let later = ViewContext {
            now: view.now + Duration::from_secs(2),
            ..ctx()
        };
        let lines = message_lines(&message, &later);
        assert!(!lines[1].spans[0].style.add_modifier.contains(Modifier::DIM));
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdef"), Line::default()];
        assert_eq!(wrapped_height(&lines, 4), 3);
    }
}
