pub mod envelope;
pub mod remote;

use crate::cli::Args;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use envelope::{ BodyField, Envelope };
pub use remote::RemoteAssistant;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Longest slice of a raw payload quoted back in error messages.
const SNIPPET_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant endpoint is not configured (set ASSISTANT_URL)")]
    NotConfigured,
    #[error("invalid assistant endpoint '{url}': {reason}")]
    InvalidEndpoint {
        url: String,
        reason: String,
    },
    #[error("request timed out after {} seconds", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("HTTP error! status: {status}{}", body_suffix(.body))]
    Status {
        status: u16,
        body: String,
    },
    #[error("response is not valid JSON: {source} (payload: {snippet})")]
    Parse {
        #[source]
        source: serde_json::Error,
        snippet: String,
    },
}

pub(crate) fn body_suffix(body: &str) -> String {
    if body.is_empty() { String::new() } else { format!(" ({})", body) }
}

#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Sends one query and returns the display text of the reply.
    async fn ask(&self, query: &str) -> Result<String, AssistantError>;

    fn endpoint(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AssistantConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            endpoint: args.assistant_url.clone().filter(|url| !url.trim().is_empty()),
            timeout: Duration::from_secs(args.assistant_timeout_secs),
        }
    }
}

pub fn new_client(config: &AssistantConfig) -> Result<Arc<dyn AssistantClient>, AssistantError> {
    let client = RemoteAssistant::from_config(config)?;
    Ok(Arc::new(client))
}

/// Stand-in used by the servers when no endpoint is configured, so chat
/// requests still get a diagnostic reply instead of a dead connection.
#[derive(Debug, Default)]
pub struct Unconfigured;

#[async_trait]
impl AssistantClient for Unconfigured {
    async fn ask(&self, _query: &str) -> Result<String, AssistantError> {
        Err(AssistantError::NotConfigured)
    }

    fn endpoint(&self) -> &str {
        "<unset>"
    }
}

/// Cuts a payload down to something readable in a chat bubble.
pub fn snippet(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(SNIPPET_LEN) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Turns a failed request into the assistant message shown to the user.
pub fn diagnostic_message(error: &AssistantError, endpoint: &str) -> String {
    format!(
        "Sorry, I couldn't get an answer from the assistant service.\n\n\
         Error: {}\n\n\
         Common causes:\n\
         • The endpoint URL is wrong ({})\n\
         • The backend is not deployed or is currently unavailable\n\
         • A cross-origin (CORS) policy or API gateway is rejecting the request",
        error,
        endpoint
    )
}
