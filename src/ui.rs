use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, InputMode};
use crate::view::{message_lines, wrapped_height, Palette, ViewContext};

/// Input box grows with newlines up to this many rows
const MAX_INPUT_ROWS: u16 = 5;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let input_rows = (app.input.split('\n').count() as u16).clamp(1, MAX_INPUT_ROWS);

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_rows + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_clear_confirm {
        render_clear_confirm(frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" 🎬 MaxMovies AI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", app.session.project),
            Style::default().fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{} t", app.theme.toggle_icon()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let palette = Palette::for_theme(app.theme);
    let now = Instant::now();

    // Selected block as (message, index within message)
    let selected = app
        .selected_block
        .and_then(|i| app.transcript.code_block_locations().get(i).copied());

    let mut lines: Vec<Line> = Vec::new();
    for (id, message) in app.transcript.messages().iter().enumerate() {
        let ctx = ViewContext {
            palette,
            now,
            animation_frame: app.animation_frame,
            selected_block: selected.filter(|(m, _)| *m == id).map(|(_, i)| i),
        };
        lines.extend(message_lines(message, &ctx));
    }

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    let inner = chat_block.inner(area);
    app.chat_height = inner.height;
    let total = wrapped_height(&lines, inner.width).min(u16::MAX as usize) as u16;
    app.max_scroll = total.saturating_sub(inner.height);
    if app.follow {
        app.scroll = app.max_scroll;
    } else {
        app.scroll = app.scroll.min(app.max_scroll);
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.is_replying() { " Ask (replying...) " } else { " Ask " };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Cursor row and column within the input
    let before: String = app.input.chars().take(app.cursor).collect();
    let cursor_row = before.matches('\n').count() as u16;
    let cursor_col = before
        .rsplit('\n')
        .next()
        .map(|line| line.chars().count())
        .unwrap_or(0);

    // Calculate scroll offsets to keep cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2);
    let col_offset = if inner_width == 0 || cursor_col < inner_width {
        0
    } else {
        cursor_col - inner_width + 1
    };
    let row_offset = cursor_row.saturating_sub(inner_height.saturating_sub(1));

    let visible: Vec<Line> = app
        .input
        .split('\n')
        .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block)
        .scroll((row_offset, 0));

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing && !app.show_clear_confirm {
        frame.set_cursor_position((
            area.x + 1 + (cursor_col - col_offset) as u16,
            area.y + 1 + cursor_row - row_offset,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " CHAT ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Alt+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" [/] ", key_style),
            Span::styled(" code ", label_style),
            Span::styled(" y ", key_style),
            Span::styled(" copy ", label_style),
            Span::styled(" t ", key_style),
            Span::styled(" theme ", label_style),
            Span::styled(" C ", key_style),
            Span::styled(" clear ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    spans.extend(hints);
    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!(" {} ", status),
            Style::default().bg(Color::Black).fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_clear_confirm(frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 44.min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Clear chat ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let text = Text::from(vec![
        Line::from("Clear the chat history and project?"),
        Line::default(),
        Line::from(vec![
            Span::styled(" y ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" clear   "),
            Span::styled(" n ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" keep"),
        ]),
    ]);
    frame.render_widget(Paragraph::new(text), inner);
}
