use super::{ snippet, AssistantClient, AssistantConfig, AssistantError, Envelope };
use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::time::Duration;
use url::Url;

#[derive(Debug)]
pub struct RemoteAssistant {
    http: HttpClient,
    endpoint: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct AskRequest<'a> {
    message: &'a str,
}

impl RemoteAssistant {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AssistantError> {
        let parsed = Url::parse(endpoint).map_err(|e| AssistantError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AssistantError::InvalidEndpoint {
                url: endpoint.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(AssistantError::Transport)?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let endpoint = config.endpoint.as_deref().ok_or(AssistantError::NotConfigured)?;
        Self::new(endpoint, config.timeout)
    }

    pub async fn send(&self, query: &str) -> Result<Envelope, AssistantError> {
        let resp = self.http
            .post(&self.endpoint)
            .json(&AskRequest { message: query })
            .send().await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            warn!("Assistant endpoint returned {}", status);
            return Err(AssistantError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        debug!("Assistant raw reply: {}", snippet(&body));
        Envelope::decode(&body).map_err(|source| AssistantError::Parse {
            source,
            snippet: snippet(&body),
        })
    }

    fn classify(&self, err: reqwest::Error) -> AssistantError {
        if err.is_timeout() {
            AssistantError::Timeout(self.timeout)
        } else {
            AssistantError::Transport(err)
        }
    }
}

#[async_trait]
impl AssistantClient for RemoteAssistant {
    async fn ask(&self, query: &str) -> Result<String, AssistantError> {
        let envelope = self.send(query).await?;
        Ok(envelope.into_text())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
