pub mod attributes;

use crate::assistant::{ body_suffix, snippet };
use crate::cli::Args;
use futures::future::join_all;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, RequestBuilder };
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

pub use attributes::{ unwrap_attribute, unwrap_item, unwrap_response };

pub const API_KEY_HEADER: &str = "x-api-key";

/// Record ids fetched by `list` when none are given.
pub const DEFAULT_RECORD_IDS: [&str; 3] = ["EDU-001", "EDU-002", "EDU-003"];

#[derive(Debug, Error)]
pub enum StudentsError {
    #[error("students API is not configured (set {0})")]
    NotConfigured(&'static str),
    #[error("students API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error! status: {status}{}", body_suffix(.body))]
    Status {
        status: u16,
        body: String,
    },
}

/// Client for the external student-record service. Every call carries the
/// API key header; record payloads are passed through as JSON.
#[derive(Debug, Clone)]
pub struct StudentsClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl StudentsClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StudentsError> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, StudentsError> {
        let base_url = args.students_api_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(StudentsError::NotConfigured("STUDENTS_API_URL"))?;
        let api_key = args.students_api_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(StudentsError::NotConfigured("STUDENTS_API_KEY"))?;
        Self::new(base_url, api_key, Duration::from_secs(args.students_timeout_secs))
    }

    fn collection_url(&self) -> String {
        format!("{}/students", self.base_url)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(API_KEY_HEADER, &self.api_key)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<JsonValue, StudentsError> {
        let resp = self.request(builder).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = snippet(&resp.text().await.unwrap_or_default());
            return Err(StudentsError::Status { status: status.as_u16(), body });
        }
        let data: JsonValue = resp.json().await?;
        debug!("Students API response: {}", data);
        Ok(unwrap_response(data))
    }

    pub async fn get(&self, record_id: &str) -> Result<JsonValue, StudentsError> {
        let builder = self.http.get(self.collection_url()).query(&[("record_id", record_id)]);
        self.execute(builder).await
    }

    /// Fetches several records concurrently. Records that fail to load are
    /// logged and left out.
    pub async fn list(&self, record_ids: &[String]) -> Vec<JsonValue> {
        let fetches = record_ids.iter().map(|id| async move { (id, self.get(id).await) });
        join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping student record {}: {}", id, e);
                    None
                }
            })
            .collect()
    }

    pub async fn create(&self, student: &JsonValue) -> Result<JsonValue, StudentsError> {
        let builder = self.http.post(self.collection_url()).json(student);
        self.execute(builder).await
    }

    pub async fn update(&self, record_id: &str, student: &JsonValue) -> Result<JsonValue, StudentsError> {
        let builder = self.http
            .put(self.collection_url())
            .query(&[("record_id", record_id)])
            .json(student);
        self.execute(builder).await
    }

    pub async fn delete(&self, record_id: &str) -> Result<JsonValue, StudentsError> {
        let builder = self.http.delete(self.collection_url()).query(&[("record_id", record_id)]);
        self.execute(builder).await
    }
}
