pub mod api;
pub mod websocket;

use crate::assistant::AssistantClient;
use crate::cli::Args;
use crate::faq::IntentTable;
use std::error::Error;
use std::sync::Arc;

/// Shared by every HTTP request and WebSocket connection.
#[derive(Clone)]
pub struct AppState {
    pub intents: Arc<IntentTable>,
    pub assistant: Arc<dyn AssistantClient>,
}

pub struct Server {
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(state: AppState, args: Args) -> Self {
        Self { state, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(http_port) = self.args.http_port {
            api::start_http_server(http_port, self.state.clone()).await?;
        }

        websocket::start_ws_server(
            &self.args.server_addr,
            self.state.clone(),
            self.args.server_api_key.clone(),
            self.args.ws_rate_limit,
        ).await
    }
}
