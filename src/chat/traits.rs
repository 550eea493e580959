//! Chat transport abstractions
//!
//! The dispatcher never talks to a transport directly: it turns an
//! [`InboundEvent`] into a list of [`Outbound`] instructions, and the bot
//! hands those to a [`ChatClient`]. Tests swap in `MockChatClient`.

use crate::gatekeeper::is_shared_by_sign;
use crate::ledger::request::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversation identifier (direct chat or group).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId(id.to_string())
    }
}

impl From<&str> for ChatId {
    fn from(id: &str) -> Self {
        ChatId(id.to_string())
    }
}

impl From<&UserId> for ChatId {
    /// Direct conversation with a user.
    fn from(user: &UserId) -> Self {
        ChatId(user.0.clone())
    }
}

/// Who sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub display_name: String,
}

/// One message received from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub channel_id: ChatId,
    pub sender: Sender,
    pub text: String,
    /// More than two participants can read the channel.
    pub is_shared: bool,
}

impl InboundEvent {
    /// Direct message from `sender`.
    pub fn direct(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            channel_id: ChatId::from(&sender.id),
            sender,
            text: text.into(),
            is_shared: false,
        }
    }

    /// Event from a transport that marks group chats with negative ids.
    pub fn from_signed_channel(channel_id: i64, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            channel_id: ChatId::from(channel_id),
            sender,
            text: text.into(),
            is_shared: is_shared_by_sign(channel_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
}

/// Where an outbound message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The conversation the event came from (or any explicit chat).
    Chat(ChatId),
    /// Direct conversation with a user.
    Direct(UserId),
    /// The configured admin; dropped when no admin is configured.
    Admin,
}

/// Instruction for the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub target: Target,
    pub text: String,
    pub format: TextFormat,
}

impl Outbound {
    pub fn reply(chat: &ChatId, text: impl Into<String>) -> Self {
        Self {
            target: Target::Chat(chat.clone()),
            text: text.into(),
            format: TextFormat::Markdown,
        }
    }

    pub fn direct(user: &UserId, text: impl Into<String>) -> Self {
        Self {
            target: Target::Direct(user.clone()),
            text: text.into(),
            format: TextFormat::Markdown,
        }
    }

    pub fn admin(text: impl Into<String>) -> Self {
        Self {
            target: Target::Admin,
            text: text.into(),
            format: TextFormat::Markdown,
        }
    }

    pub fn is_admin_notice(&self) -> bool {
        self.target == Target::Admin
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Transport closed")]
    Closed,

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

/// Chat transport abstraction.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send text to a conversation.
    async fn send_message(&self, chat: &ChatId, text: &str, format: TextFormat) -> ChatResult<()>;

    /// Next batch of inbound events; may be empty.
    ///
    /// `ChatError::Closed` means no more events will ever arrive.
    async fn receive_messages(&self) -> ChatResult<Vec<InboundEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Sender {
        Sender {
            id: UserId::from(7),
            username: Some("alice".to_string()),
            display_name: "Alice".to_string(),
        }
    }

    #[test]
    fn test_signed_channel_convention() {
        let group = InboundEvent::from_signed_channel(-100123, alice(), "hi");
        assert!(group.is_shared);
        assert_eq!(group.channel_id, ChatId::from("-100123"));

        let dm = InboundEvent::from_signed_channel(7, alice(), "hi");
        assert!(!dm.is_shared);
    }

    #[test]
    fn test_direct_event_uses_sender_chat() {
        let event = InboundEvent::direct(alice(), "/start");
        assert_eq!(event.channel_id, ChatId::from("7"));
        assert!(!event.is_shared);
    }

    #[test]
    fn test_event_json_requires_shared_flag() {
        let json = r#"{"channel_id":"7","sender":{"id":"7","display_name":"Alice"},"text":"hello"}"#;
        assert!(serde_json::from_str::<InboundEvent>(json).is_err());

        let json = r#"{"channel_id":"7","sender":{"id":"7","display_name":"Alice"},"text":"hello","is_shared":false}"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        assert!(!event.is_shared);
        assert_eq!(event.sender.username, None);
    }
}
