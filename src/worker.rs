use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};

use crate::client::ChatClient;
use crate::conversation::Message;
use crate::error::ChatError;
use crate::tui::AppEvent;

/// Stream one reply into the event loop.
///
/// Sends a `ReplyChunk` per decoded chunk in arrival order, then exactly one
/// `ReplyFinished` or `ReplyFailed`. Widget state is never touched here.
pub async fn stream_reply(
    client: ChatClient,
    history: Vec<Message>,
    events: UnboundedSender<AppEvent>,
) {
    let outcome = forward_chunks(&client, &history, &events).await;

    let event = match outcome {
        Ok(Forwarded::Complete { chunks, bytes }) => {
            info!(chunks, bytes, "reply finished");
            AppEvent::ReplyFinished
        }
        Ok(Forwarded::ReceiverGone) => {
            debug!("event loop closed, dropping reply");
            return;
        }
        Err(err) => {
            error!(error = %err, endpoint = client.endpoint(), "reply failed");
            AppEvent::ReplyFailed(err.to_string())
        }
    };

    let _ = events.send(event);
}

enum Forwarded {
    Complete { chunks: usize, bytes: usize },
    ReceiverGone,
}

async fn forward_chunks(
    client: &ChatClient,
    history: &[Message],
    events: &UnboundedSender<AppEvent>,
) -> Result<Forwarded, ChatError> {
    let mut reply = client.send(history).await?;
    let mut chunks = 0;
    let mut bytes = 0;

    while let Some(text) = reply.next_chunk().await? {
        chunks += 1;
        bytes += text.len();
        debug!(len = text.len(), "reply chunk");
        if events.send(AppEvent::ReplyChunk(text)).is_err() {
            return Ok(Forwarded::ReceiverGone);
        }
    }

    Ok(Forwarded::Complete { chunks, bytes })
}
