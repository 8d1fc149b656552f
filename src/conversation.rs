use serde::{Deserialize, Serialize};

/// Greeting seeded into every new conversation.
pub const DEFAULT_GREETING: &str =
    "Hi! I'm the Headstarter support assistant. How can I help you today?";

/// Reply appended when a send fails for any reason.
pub const ERROR_REPLY: &str = "I'm sorry, but I encountered an error. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered chat history. Order is chronological and is the only relation
/// between messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(greeting: &str) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns the conversation with `text` appended to the last message.
    ///
    /// Every earlier message is carried over as-is; the last one is replaced by
    /// a new message with the grown content.
    #[must_use]
    pub fn extend_last(mut self, text: &str) -> Self {
        if let Some(last) = self.messages.pop() {
            let mut content = last.content;
            content.push_str(text);
            self.messages.push(Message {
                role: last.role,
                content,
            });
        }
        self
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}
