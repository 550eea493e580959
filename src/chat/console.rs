//! JSON-lines transport
//!
//! Reads one [`InboundEvent`] per line and writes one JSON object per
//! outbound message: `{"chat": "...", "format": "markdown", "text": "..."}`.
//! Lets the bot run behind any process that can speak line-delimited JSON,
//! or by hand from a terminal.
//!
//! `is_shared` may be omitted when `channel_id` is numeric; negative ids then
//! mark group chats. A negative id is treated as shared even when the flag
//! says otherwise. Events that carry neither are rejected.

use super::traits::*;
use crate::gatekeeper::is_shared_by_sign;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Serialize)]
struct OutboundLine<'a> {
    chat: &'a ChatId,
    format: TextFormat,
    text: &'a str,
}

/// Inbound line as written by the peer process.
#[derive(Deserialize)]
struct InboundLine {
    channel_id: ChatId,
    sender: Sender,
    text: String,
    #[serde(default)]
    is_shared: Option<bool>,
}

impl InboundLine {
    fn into_event(self) -> ChatResult<InboundEvent> {
        let signed_shared = self
            .channel_id
            .0
            .parse::<i64>()
            .ok()
            .map(is_shared_by_sign);

        let is_shared = match (self.is_shared, signed_shared) {
            (Some(flag), signed) => flag || signed.unwrap_or(false),
            (None, Some(signed)) => signed,
            (None, None) => {
                return Err(ChatError::InvalidEvent(format!(
                    "channel '{}' is not numeric and is_shared is missing",
                    self.channel_id
                )))
            }
        };

        Ok(InboundEvent {
            channel_id: self.channel_id,
            sender: self.sender,
            text: self.text,
            is_shared,
        })
    }
}

pub struct ConsoleClient<R, W> {
    reader: Mutex<Lines<R>>,
    writer: Mutex<W>,
}

impl ConsoleClient<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleClient<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader.lines()),
            writer: Mutex::new(writer),
        }
    }

    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<R, W> ChatClient for ConsoleClient<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send_message(&self, chat: &ChatId, text: &str, format: TextFormat) -> ChatResult<()> {
        let mut line = serde_json::to_vec(&OutboundLine { chat, format, text })
            .map_err(|e| ChatError::InvalidEvent(e.to_string()))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))
    }

    async fn receive_messages(&self) -> ChatResult<Vec<InboundEvent>> {
        let mut reader = self.reader.lock().await;
        loop {
            let line = reader
                .next_line()
                .await
                .map_err(|e| ChatError::Network(e.to_string()))?
                .ok_or(ChatError::Closed)?;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!(bytes = line.len(), "console event received");
            let event: InboundLine =
                serde_json::from_str(line).map_err(|e| ChatError::InvalidEvent(e.to_string()))?;
            return Ok(vec![event.into_event()?]);
        }
    }
}
