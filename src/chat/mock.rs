//! Mock chat client for testing
//!
//! Queued inbound events are delivered one batch per `receive_messages`
//! call; once the queue is empty and the mock is closed, receiving returns
//! `ChatError::Closed` so a bot run loop ends.

use super::traits::*;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Default)]
pub struct MockChatClient {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    sent_messages: Vec<SentMessage>,
    incoming: VecDeque<Vec<InboundEvent>>,
    failing_chats: HashSet<ChatId>,
    closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
    pub format: TextFormat,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue one event as its own batch.
    pub fn add_incoming_message(&self, event: InboundEvent) {
        self.state().incoming.push_back(vec![event]);
    }

    /// Queue several events delivered together.
    pub fn add_incoming_batch(&self, events: Vec<InboundEvent>) {
        self.state().incoming.push_back(events);
    }

    /// End the inbound stream after the queued batches.
    pub fn close(&self) {
        self.state().closed = true;
    }

    /// Make every send to `chat` fail with a network error.
    pub fn fail_sends_to(&self, chat: ChatId) {
        self.state().failing_chats.insert(chat);
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state().sent_messages.clone()
    }

    /// Texts sent to one conversation, in order.
    pub fn sent_to(&self, chat: &ChatId) -> Vec<String> {
        self.state()
            .sent_messages
            .iter()
            .filter(|m| &m.chat == chat)
            .map(|m| m.text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn send_message(&self, chat: &ChatId, text: &str, format: TextFormat) -> ChatResult<()> {
        let mut state = self.state();
        if state.failing_chats.contains(chat) {
            return Err(ChatError::Network(format!("send to {} failed", chat)));
        }
        state.sent_messages.push(SentMessage {
            chat: chat.clone(),
            text: text.to_string(),
            format,
        });
        Ok(())
    }

    async fn receive_messages(&self) -> ChatResult<Vec<InboundEvent>> {
        let mut state = self.state();
        match state.incoming.pop_front() {
            Some(batch) => Ok(batch),
            None if state.closed => Err(ChatError::Closed),
            None => Ok(Vec::new()),
        }
    }
}
