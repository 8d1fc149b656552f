use reqwest::{Client, Response};
use tracing::debug;

use crate::conversation::Message;
use crate::decoder::Utf8StreamDecoder;
use crate::error::ChatError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/chat";

#[derive(Clone, Debug)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the history and hand back the streaming reply body.
    ///
    /// The body is a JSON array of `{role, content}` records in chronological
    /// order. A non-success status is an error and its body is dropped unread.
    pub async fn send(&self, history: &[Message]) -> Result<ReplyStream, ChatError> {
        debug!(endpoint = %self.endpoint, messages = history.len(), "posting conversation");

        let response = self
            .client
            .post(&self.endpoint)
            .json(history)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Status(response.status()));
        }

        Ok(ReplyStream::new(response))
    }
}

/// Reply body read chunk by chunk, decoded as text.
pub struct ReplyStream {
    response: Response,
    decoder: Utf8StreamDecoder,
    done: bool,
}

impl ReplyStream {
    fn new(response: Response) -> Self {
        Self {
            response,
            decoder: Utf8StreamDecoder::new(),
            done: false,
        }
    }

    /// Next piece of decoded text, or `None` once the body has ended.
    ///
    /// Chunks that decode to nothing (a lone fragment of a multi-byte
    /// character) are skipped rather than returned as empty strings.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, ChatError> {
        while !self.done {
            match self.response.chunk().await? {
                Some(bytes) => {
                    let text = self.decoder.decode(&bytes);
                    if !text.is_empty() {
                        return Ok(Some(text));
                    }
                }
                None => {
                    self.done = true;
                    let tail = self.decoder.finish();
                    if !tail.is_empty() {
                        return Ok(Some(tail));
                    }
                }
            }
        }
        Ok(None)
    }
}
