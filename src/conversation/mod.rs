mod session;

use crate::models::chat::ChatMessage;
use serde::Serialize;

pub use session::{ ChatSession, PendingReply, SessionError, SubmitOutcome };

pub const GREETING: &str =
    "Hi! I'm the Studentlytics assistant. Ask me about attendance, engagement or your class sessions.";

/// Append-only message log for one session. Nothing here is persisted.
#[derive(Clone, Debug, Serialize)]
pub struct Conversation {
    id: String,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
        }
    }

    /// A fresh conversation opened by the assistant's greeting.
    pub fn seeded(id: impl Into<String>) -> Self {
        let mut conversation = Self::new(id);
        conversation.append(ChatMessage::assistant(GREETING));
        conversation
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn format_transcript(conversation: &Conversation) -> String {
    let mut result = String::new();
    for msg in conversation.history() {
        result.push_str(&format!("{}: {}\n", msg.role, msg.content));
    }
    result
}
