use super::{ format_transcript, Conversation };
use crate::assistant::{ diagnostic_message, AssistantClient };
use crate::models::chat::ChatMessage;
use futures::future::{ AbortHandle, AbortRegistration, Abortable };
use log::{ info, warn };
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a request is already in progress")]
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Replied(ChatMessage),
    /// The request failed; the diagnostic was appended as an assistant message.
    Failed(ChatMessage),
    /// Aborted before a reply arrived. Nothing was appended for it.
    Cancelled,
}

impl SubmitOutcome {
    pub fn message(&self) -> Option<&ChatMessage> {
        match self {
            SubmitOutcome::Replied(msg) | SubmitOutcome::Failed(msg) => Some(msg),
            SubmitOutcome::Cancelled => None,
        }
    }
}

/// One user's chat with the remote assistant.
///
/// At most one request is in flight; further submissions are refused with
/// [`SessionError::Busy`] until it settles, so replies land in the order their
/// questions were asked.
pub struct ChatSession {
    conversation: Mutex<Conversation>,
    in_flight: Mutex<Option<AbortHandle>>,
    assistant: Arc<dyn AssistantClient>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChatSession {
    pub fn new(assistant: Arc<dyn AssistantClient>) -> Arc<Self> {
        Self::with_id(Uuid::new_v4().to_string(), assistant)
    }

    pub fn with_id(id: impl Into<String>, assistant: Arc<dyn AssistantClient>) -> Arc<Self> {
        Arc::new(Self {
            conversation: Mutex::new(Conversation::seeded(id)),
            in_flight: Mutex::new(None),
            assistant,
        })
    }

    pub fn id(&self) -> String {
        lock(&self.conversation).id().to_string()
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        lock(&self.conversation).history().to_vec()
    }

    pub fn transcript(&self) -> String {
        format_transcript(&lock(&self.conversation))
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    /// Records the user's message and reserves the in-flight slot. The request
    /// itself is sent by [`PendingReply::finish`].
    pub fn begin(self: &Arc<Self>, text: &str) -> Result<PendingReply, SessionError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let registration = {
            let mut slot = lock(&self.in_flight);
            if slot.is_some() {
                return Err(SessionError::Busy);
            }
            let (handle, registration) = AbortHandle::new_pair();
            *slot = Some(handle);
            registration
        };

        self.append(ChatMessage::user(query));
        Ok(PendingReply {
            session: Arc::clone(self),
            query: query.to_string(),
            registration: Some(registration),
        })
    }

    pub async fn submit(self: &Arc<Self>, text: &str) -> Result<SubmitOutcome, SessionError> {
        let pending = self.begin(text)?;
        Ok(pending.finish().await)
    }

    /// Aborts the in-flight request, if any. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        match lock(&self.in_flight).as_ref() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn append(&self, message: ChatMessage) {
        lock(&self.conversation).append(message);
    }

    fn release(&self) {
        lock(&self.in_flight).take();
    }
}

/// A submitted question awaiting its reply. Dropping it frees the session for
/// the next submission.
pub struct PendingReply {
    session: Arc<ChatSession>,
    query: String,
    registration: Option<AbortRegistration>,
}

impl PendingReply {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub async fn finish(mut self) -> SubmitOutcome {
        let registration = match self.registration.take() {
            Some(registration) => registration,
            None => {
                return SubmitOutcome::Cancelled;
            }
        };
        let assistant = Arc::clone(&self.session.assistant);

        match Abortable::new(assistant.ask(&self.query), registration).await {
            Ok(Ok(text)) => {
                let reply = ChatMessage::assistant(text);
                self.session.append(reply.clone());
                SubmitOutcome::Replied(reply)
            }
            Ok(Err(e)) => {
                warn!("Assistant request failed for session {}: {}", self.session.id(), e);
                let reply = ChatMessage::assistant(diagnostic_message(&e, assistant.endpoint()));
                self.session.append(reply.clone());
                SubmitOutcome::Failed(reply)
            }
            Err(_) => {
                info!("Assistant request cancelled for session {}", self.session.id());
                SubmitOutcome::Cancelled
            }
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.session.release();
    }
}
