use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::ReplyChunk(text) => app.apply_chunk(&text),
        AppEvent::ReplyFinished => app.finish_send(),
        AppEvent::ReplyFailed(reason) => app.fail_send(&reason),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,

        // Shift+Enter is reserved for multi-line input and never sends
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {}
        KeyCode::Enter => app.send_message(),

        // Input editing
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),

        // Control/Alt chords are shortcuts, not text
        KeyCode::Char(c)
            if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            app.insert_char(c)
        }

        // Message list scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::PageDown => app.scroll_down(app.half_page()),

        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::Down(MouseButton::Left) => {
            let on_send = app
                .send_button
                .map(|r| point_in_rect(mouse.column, mouse.row, r))
                .unwrap_or(false);
            if on_send {
                app.send_message();
            }
        }
        _ => {}
    }
}
