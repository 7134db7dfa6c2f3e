use dattebayo_core::credentials::mask_secret;
use dattebayo_core::params::{MAX_TEMPERATURE, MIN_TEMPERATURE};
use dattebayo_core::persona::{ASSISTANT_LABEL, BUSY_TEXT, FAN_DISCLAIMER, SUGGESTED_PROMPTS};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after_open = &rest[start + 2..];
        match after_open.find("**") {
            Some(end) if end > 0 => {
                if start > 0 {
                    spans.push(Span::raw(rest[..start].to_string()));
                }
                spans.push(Span::styled(
                    after_open[..end].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after_open[end + 2..];
            }
            // No closing **, treat the rest as literal
            _ => break,
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);

    // Chat takes three quarters, settings the rest
    let [chat_column, settings_area] =
        Layout::horizontal([Constraint::Ratio(3, 4), Constraint::Ratio(1, 4)]).areas(body_area);
    let [chat_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(chat_column);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_status(app, frame, status_area);
    render_settings(app, frame, settings_area);
    render_footer(app, frame, footer_area);

    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            " Naruto-style Chatbot (fan-made, Dattebayo!) ",
            Style::default().fg(Color::Yellow).bold(),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);

    let user_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let assistant_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let chat_text = if app.history().is_empty() && !app.is_busy() {
        let mut lines = vec![Line::from(Span::styled(
            "Ask Naruto anything! Try:",
            Style::default().fg(Color::DarkGray),
        ))];
        for prompt in SUGGESTED_PROMPTS {
            lines.push(Line::from(Span::styled(
                format!("  - {}", prompt),
                Style::default().fg(Color::DarkGray),
            )));
        }
        Text::from(lines)
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for exchange in app.history() {
            lines.push(Line::from(Span::styled("You:", user_style)));
            lines.extend(exchange.user.lines().map(|l| Line::from(l.to_string())));
            lines.push(Line::default());

            lines.push(Line::from(Span::styled(format!("{}:", ASSISTANT_LABEL), assistant_style)));
            lines.extend(exchange.assistant.lines().map(parse_markdown_line));
            lines.push(Line::default());
        }

        if let Some(pending) = app.pending_user() {
            lines.push(Line::from(Span::styled("You:", user_style)));
            lines.extend(pending.lines().map(|l| Line::from(l.to_string())));
            lines.push(Line::default());
        }

        if app.is_busy() {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("{} {}", BUSY_TEXT, dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Chat ({}, temp {:.1}) ", app.params.model, app.params.temperature));

    let chat = Paragraph::new(chat_text).wrap(Wrap { trim: true });

    // Clamp against the wrapped height so the last line stays reachable
    let total_lines = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);
    app.chat_max_scroll = total_lines.saturating_sub(app.chat_height);
    app.chat_scroll = app.chat_scroll.min(app.chat_max_scroll);

    let chat = chat.block(chat_block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Input && !app.show_api_key_input && !app.show_model_picker;
    let border_color = if focused && !app.is_busy() { Color::Yellow } else { Color::DarkGray };
    let title = if app.is_busy() { " Waiting for a reply... " } else { " Ask Naruto (Enter to send) " };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Scroll horizontally to keep the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.input_cursor < inner_width {
        0
    } else {
        app.input_cursor - inner_width + 1
    };

    let visible_text: String = app.input.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if focused {
        let cursor_x = (app.input_cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
    }
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let status = match &app.transient_error {
        Some(message) => Paragraph::new(format!(" {}", message)).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(""),
    };
    frame.render_widget(status, area);
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Settings;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let label = Style::default().fg(Color::DarkGray);

    let key_line = match app.key_source {
        Some(source) => source.label().to_string(),
        None if !app.api_key_input.is_empty() => mask_secret(&app.api_key_input),
        None => "not set".to_string(),
    };

    let lines = vec![
        Line::from(Span::styled("Model", label)),
        Line::from(Span::styled(app.params.model.clone(), Style::default().fg(Color::Green).bold())),
        Line::default(),
        Line::from(Span::styled(
            format!("Creativity (temperature) {:.1}-{:.1}", MIN_TEMPERATURE, MAX_TEMPERATURE),
            label,
        )),
        Line::from(temperature_gauge(app.params.temperature)),
        Line::default(),
        Line::from(Span::styled("API key", label)),
        Line::from(key_line),
        Line::default(),
        Line::from(Span::styled("Note:", Style::default().bold())),
        Line::from(FAN_DISCLAIMER),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Settings ");

    let settings = Paragraph::new(Text::from(lines)).block(block).wrap(Wrap { trim: true });
    frame.render_widget(settings, area);
}

fn temperature_gauge(temperature: f32) -> Line<'static> {
    let steps = (MAX_TEMPERATURE * 10.0).round() as usize;
    let filled = ((temperature * 10.0).round() as usize).min(steps);
    Line::from(vec![
        Span::styled("#".repeat(filled), Style::default().fg(Color::Yellow)),
        Span::styled("-".repeat(steps - filled), Style::default().fg(Color::DarkGray)),
        Span::raw(format!(" {:.1}", temperature)),
    ])
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match app.focus {
        FocusPane::Input => &[("Enter", "send"), ("Tab", "settings"), ("PgUp/PgDn", "scroll"), ("^C", "quit")],
        FocusPane::Settings => &[
            ("m", "model"),
            ("+/-", "temperature"),
            ("j/k", "scroll"),
            ("Tab", "chat"),
            ("q", "quit"),
        ],
    };

    let spans: Vec<Span> = pairs
        .iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(format!(" {} ", key), key_style),
                Span::styled(format!(" {} ", label), label_style),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Centered popup of at most `width` x `height`
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = popup_rect(area, 50, app.available_models.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == &app.params.model {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = popup_rect(area, 64, 8);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Enter OpenAI API Key ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new(
        "No OPENAI_API_KEY found in the secrets file or environment. \
         It is only kept for this session. Enter to continue, Esc to quit.",
    )
    .style(Style::default().fg(Color::DarkGray))
    .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 3.min(inner.height)));

    if inner.height < 5 {
        return;
    }
    let input_area = Rect::new(inner.x, inner.y + 4, inner.width, 1);

    // Mask the key with asterisks (show last 4 chars)
    let input = Paragraph::new(mask_secret(&app.api_key_input)).style(Style::default().fg(Color::Cyan));
    frame.render_widget(input, input_area);

    let cursor_x = app.api_key_input_cursor.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}
