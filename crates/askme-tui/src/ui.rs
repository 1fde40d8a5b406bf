use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use askme_core::{ChatRole, Phase};
use crate::app::{App, InputMode, PromptKind, Screen};

const ACCENT: Color = Color::LightMagenta;
const ACCENT_STRONG: Color = Color::Magenta;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);

    match app.screen() {
        Screen::Upload => {
            app.chat_area = None;
            render_upload_screen(app, frame, body_area);
        }
        Screen::Chat => {
            app.drop_area = None;
            render_chat_screen(app, frame, body_area);
        }
    }

    render_footer(app, frame, footer_area);

    if app.prompt.is_some() {
        render_prompt(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Ask Me Girl ", Style::default().fg(ACCENT).bold()),
        Span::styled(
            "Your sassy smart bestie to help you learn",
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints: &[(&str, &str)] = if app.prompt.is_some() {
        &[("Enter", "confirm"), ("Esc", "cancel")]
    } else {
        match (app.screen(), app.input_mode) {
            (Screen::Upload, _) if app.session.phase() == Phase::Processing => {
                &[("q", "quit")]
            }
            (Screen::Upload, _) => &[
                ("o", "choose PDF"),
                ("drag", "drop a file"),
                ("x", "remove"),
                ("Enter", "let's go"),
                ("u", "backend URL"),
                ("q", "quit"),
            ],
            (Screen::Chat, InputMode::Editing) => {
                &[("Enter", "send"), ("↑/↓", "scroll"), ("Esc", "stop typing")]
            }
            (Screen::Chat, InputMode::Normal) => &[
                ("i", "type"),
                ("j/k", "scroll"),
                ("r", "read something else"),
                ("q", "quit"),
            ],
        }
    };

    let mut spans = Vec::new();
    for (key, action) in hints {
        spans.push(Span::styled(
            format!(" {} ", key),
            Style::default().fg(Color::Black).bg(ACCENT),
        ));
        spans.push(Span::styled(
            format!(" {}  ", action),
            Style::default().fg(Color::Gray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Keep the cards readable on very wide terminals.
fn card_area(area: Rect) -> Rect {
    let width = area.width.min(84);
    let x = area.x + (area.width - width) / 2;
    Rect::new(x, area.y, width, area.height)
}

fn render_upload_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let card = card_area(area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT))
        .title(Span::styled(
            " Hey babes! What are we reading today? ",
            Style::default().fg(ACCENT_STRONG).bold(),
        ));
    let inner = block.inner(card);
    frame.render_widget(block, card);

    let error_height = if app.session.error().is_some() { 3 } else { 0 };
    let [intro_area, drop_area, button_area, error_area, _, backend_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Length(3),
        Constraint::Length(error_height),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(inner);

    let intro = Paragraph::new(
        "Drop your PDF below and I'll read it for you. No need to read the boring stuff - I got you! 💅",
    )
    .style(Style::default().fg(Color::Gray))
    .wrap(Wrap { trim: true });
    frame.render_widget(intro, intro_area);

    // Store area for mouse hit-testing
    app.drop_area = Some(drop_area);
    render_drop_zone(app, frame, drop_area);

    let processing = app.session.phase() == Phase::Processing;
    let label = if processing {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!("Reading PDF{}", dots)
    } else {
        "→ Let's Go!".to_string()
    };
    let button_style = if app.session.can_submit_document() {
        Style::default().fg(Color::White).bg(ACCENT_STRONG).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let button = Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(button_style)
        .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded));
    frame.render_widget(button, button_area);

    if let Some(error) = app.session.error() {
        render_error(frame, error_area, error);
    }

    let backend = Paragraph::new(Line::from(vec![
        Span::styled("Backend: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.base_url.clone(), Style::default().fg(Color::Gray)),
    ]));
    frame.render_widget(backend, backend_area);
}

fn render_drop_zone(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.session.is_dragging() { ACCENT_STRONG } else { ACCENT };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if app.session.is_dragging() { BorderType::Thick } else { BorderType::Plain })
        .border_style(Style::default().fg(border_color));

    let text = match app.session.document() {
        None => Text::from(vec![
            Line::default(),
            Line::from(Span::styled(
                "Drag & drop your PDF here",
                Style::default().fg(ACCENT_STRONG).bold(),
            )),
            Line::from(Span::styled("or", Style::default().fg(Color::DarkGray))),
            Line::from(Span::styled(
                "press o to choose a PDF",
                Style::default().fg(ACCENT),
            )),
        ]),
        Some(doc) => Text::from(vec![
            Line::default(),
            Line::from(Span::styled(
                format!("📄 {}", doc.name()),
                Style::default().fg(ACCENT_STRONG).bold(),
            )),
            Line::from(Span::styled(doc.display_size(), Style::default().fg(Color::Gray))),
            Line::from(Span::styled(
                "x to remove",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ]),
    };

    let zone = Paragraph::new(text).alignment(Alignment::Center).block(block);
    frame.render_widget(zone, area);
}

fn render_error(frame: &mut Frame, area: Rect, error: &str) {
    let error = Paragraph::new(error.to_string())
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    frame.render_widget(error, area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let card = card_area(area);

    let error_height = if app.session.error().is_some() { 3 } else { 0 };
    let [reading_area, chat_area, input_area, error_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(error_height),
    ])
    .areas(card);

    let name = app.session.document().map(|d| d.name()).unwrap_or_default();
    let reading = Line::from(vec![
        Span::styled(format!("📄 Reading: {}", name), Style::default().fg(ACCENT_STRONG).bold()),
        Span::styled("  (r: read something else)", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(reading), reading_area);

    // Store area for mouse hit-testing and chat dimensions for scroll
    // calculations (inner size minus borders)
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT))
        .title(Span::styled(
            " Let's chat, bestie! ",
            Style::default().fg(ACCENT_STRONG).bold(),
        ));

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.session.transcript() {
        let (label, color) = match msg.role {
            ChatRole::User => ("You:", Color::Cyan),
            ChatRole::Assistant => ("Bestie:", ACCENT_STRONG),
            ChatRole::System => ("System:", Color::DarkGray),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for line in msg.content.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    if app.session.chat_pending() {
        lines.push(Line::from(Span::styled(
            "Bestie:",
            Style::default().fg(ACCENT_STRONG).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    render_chat_input(app, frame, input_area);

    if let Some(error) = app.session.error() {
        render_error(frame, error_area, error);
    }
}

fn render_chat_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && !app.session.chat_pending();
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask me anything about this PDF... ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor.min(app.session.input().chars().count());
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .session
        .input()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let style = if app.session.chat_pending() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    frame.render_widget(Paragraph::new(visible_text).style(style).block(input_block), area);

    // Show cursor when editing
    if editing && app.prompt.is_none() {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let Some(prompt) = &app.prompt else {
        return;
    };

    let title = match prompt.kind {
        PromptKind::OpenFile => " Choose a PDF (path) ",
        PromptKind::BaseUrl => " Backend URL ",
    };

    let width = area.width.saturating_sub(4).min(70);
    let popup = Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + area.height.saturating_sub(3) / 2,
        width,
        3.min(area.height),
    );

    let inner_width = popup.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && prompt.cursor >= inner_width {
        prompt.cursor - inner_width + 1
    } else {
        0
    };
    let visible_text: String = prompt
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(visible_text).block(block), popup);

    let cursor_x = (prompt.cursor - scroll_offset) as u16;
    frame.set_cursor_position((popup.x + cursor_x + 1, popup.y + 1));
}
