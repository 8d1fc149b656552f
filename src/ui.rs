use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use crate::app::App;
use crate::conversation::{Message, Role};

/// Widest the chat card gets, in columns
const CARD_WIDTH: u16 = 72;

const ASSISTANT_BG: Color = Color::Blue;
const USER_BG: Color = Color::Magenta;

pub fn render(app: &mut App, frame: &mut Frame) {
    let card = centered_column(frame.area(), CARD_WIDTH);

    // Card layout: header, message list, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(card);

    render_header(app, frame, header_area);
    render_messages(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn centered_column(area: Rect, max_width: u16) -> Rect {
    let width = area.width.min(max_width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Support Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(app.endpoint().to_string(), Style::default().fg(Color::DarkGray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    let lines = conversation_lines(app.conversation.messages(), inner.width);

    // Keep scroll bookkeeping in sync with what is actually drawn
    app.chat_height = inner.height;
    app.chat_lines = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let max_scroll = app.chat_lines.saturating_sub(app.chat_height);
    app.chat_scroll = if app.follow_newest {
        max_scroll
    } else {
        app.chat_scroll.min(max_scroll)
    };

    let list = Paragraph::new(lines)
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(list, area);
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let sending = app.is_sending();

    let (border_color, text_color) = if sending {
        (Color::DarkGray, Color::DarkGray)
    } else {
        (Color::Yellow, Color::Cyan)
    };

    let button = if sending { "[ Sending... ]" } else { "[ Send ]" };
    let label = format!(" {button} ");

    // Right-aligned titles end one cell before the top-right corner
    let label_width = (label.chars().count() as u16).min(area.width.saturating_sub(2));
    app.send_button = Some(Rect::new(
        area.x + area.width.saturating_sub(1 + label_width),
        area.y,
        label_width,
        1,
    ));

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ")
        .title_top(Line::from(label).right_aligned());

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    // Get the visible slice of the input
    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(input_block);

    frame.render_widget(input, area);

    // No cursor while the field is disabled
    if !sending && inner_width > 0 {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let hint_style = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled(" Enter", key_style),
        Span::styled(" send  ", hint_style),
        Span::styled("PgUp/PgDn", key_style),
        Span::styled(" scroll  ", hint_style),
        Span::styled("Esc", key_style),
        Span::styled(" quit", hint_style),
    ];
    if app.is_sending() {
        spans.push(Span::styled("  waiting for reply", hint_style.add_modifier(Modifier::ITALIC)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// All message bubbles, top to bottom, pre-wrapped to `width` columns.
pub fn conversation_lines(messages: &[Message], width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        lines.extend(bubble_lines(message, width));
        lines.push(Line::default());
    }
    lines
}

/// One message as a padded block of text on its role's color.
///
/// Assistant bubbles sit on the left, user bubbles on the right. Text wraps
/// at three quarters of the list width.
fn bubble_lines(message: &Message, width: u16) -> Vec<Line<'static>> {
    let (bg, alignment) = match message.role {
        Role::Assistant => (ASSISTANT_BG, Alignment::Left),
        Role::User => (USER_BG, Alignment::Right),
    };
    let style = Style::default().fg(Color::White).bg(bg);

    let text_width = (usize::from(width) * 3 / 4).saturating_sub(2).max(1);
    let wrapped = wrap_text(&message.content, text_width);
    let bubble_width = wrapped
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);

    wrapped
        .into_iter()
        .map(|line| {
            Line::from(Span::styled(format!(" {line:<bubble_width$} "), style))
                .alignment(alignment)
        })
        .collect()
}

/// Word-wrap on spaces, hard-splitting words longer than `width`.
/// Explicit newlines are kept, so the result always has at least one line.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let text = text.replace('\r', "").replace('\t', "    ");
    let mut out = Vec::new();

    for raw_line in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in raw_line.split(' ') {
            let word_len = word.chars().count();
            let needed = if current_len == 0 {
                word_len
            } else {
                current_len + 1 + word_len
            };

            if needed <= width {
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.push_str(word);
                current_len += word_len;
                continue;
            }

            if current_len > 0 {
                out.push(std::mem::take(&mut current));
            }

            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > width {
                out.push(chars.drain(..width).collect());
            }
            current = chars.into_iter().collect();
            current_len = current.chars().count();
        }

        out.push(current);
    }

    out
}
