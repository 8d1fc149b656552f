use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::client::ChatClient;
use crate::conversation::{Conversation, Message, ERROR_REPLY};
use crate::tui::AppEvent;
use crate::worker;

/// Whether a reply is in flight. At most one send runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    Sending,
}

impl SendState {
    /// Idle -> Sending. Returns false (and stays put) if already sending.
    fn begin(&mut self) -> bool {
        match self {
            SendState::Idle => {
                *self = SendState::Sending;
                true
            }
            SendState::Sending => false,
        }
    }

    fn settle(&mut self) {
        *self = SendState::Idle;
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,

    // Chat state
    pub conversation: Conversation,
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub state: SendState,

    // Message list scrolling (height and line count are written by the renderer)
    pub chat_scroll: u16,
    pub follow_newest: bool,
    pub chat_height: u16,
    pub chat_lines: u16,

    // Send label area for mouse hit-testing (updated during render)
    pub send_button: Option<Rect>,

    client: ChatClient,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(client: ChatClient, greeting: &str, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::new(greeting),
            input: String::new(),
            cursor: 0,
            state: SendState::Idle,
            chat_scroll: 0,
            follow_newest: true,
            chat_height: 0,
            chat_lines: 0,
            send_button: None,
            client,
            events,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    pub fn is_sending(&self) -> bool {
        self.state == SendState::Sending
    }

    /// Send the input buffer and start streaming the reply in the background.
    pub fn send_message(&mut self) {
        if let Some(history) = self.begin_send() {
            info!(messages = history.len(), "sending message");
            tokio::spawn(worker::stream_reply(
                self.client.clone(),
                history,
                self.events.clone(),
            ));
        }
    }

    /// Synchronous half of a send.
    ///
    /// Returns `None` without touching anything when the trimmed input is
    /// empty or a reply is already streaming. Otherwise moves to `Sending`,
    /// clears the input, appends the user message and an empty assistant
    /// placeholder, and returns the history to post: everything before this
    /// send plus the new user message.
    pub fn begin_send(&mut self) -> Option<Vec<Message>> {
        if self.input.trim().is_empty() {
            return None;
        }
        if !self.state.begin() {
            return None;
        }

        let text = std::mem::take(&mut self.input);
        self.cursor = 0;

        let mut history = self.conversation.messages().to_vec();
        history.push(Message::user(text.clone()));

        self.conversation.push(Message::user(text));
        self.conversation.push(Message::assistant(""));
        self.follow_newest = true;

        Some(history)
    }

    pub fn apply_chunk(&mut self, text: &str) {
        if !self.is_sending() {
            warn!(len = text.len(), "reply chunk arrived while idle, ignoring");
            return;
        }
        let conversation = std::mem::take(&mut self.conversation);
        self.conversation = conversation.extend_last(text);
        self.follow_newest = true;
    }

    pub fn finish_send(&mut self) {
        self.state.settle();
    }

    /// Append the apology after whatever the placeholder holds and go idle.
    pub fn fail_send(&mut self, reason: &str) {
        if !self.is_sending() {
            return;
        }
        warn!(reason, "send failed, showing error reply");
        self.conversation.push(Message::assistant(ERROR_REPLY));
        self.follow_newest = true;
        self.state.settle();
    }

    // Input editing (disabled while a reply is streaming)

    pub fn insert_char(&mut self, c: char) {
        if self.is_sending() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.is_sending() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.is_sending() {
            return;
        }
        let char_count = self.input.chars().count();
        if self.cursor < char_count {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Message list scrolling

    fn max_scroll(&self) -> u16 {
        self.chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_newest = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        // Back at the bottom: keep up with new content again
        self.follow_newest = self.chat_scroll == max;
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }
}
