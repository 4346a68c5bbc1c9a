//! Polling Client
//!
//! One-shot GETs against the queue server's statistics endpoints, used
//! when the live stream is not wanted or not available.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::stream::QueueId;

/// One element of `GET /get_queue_data/`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueueStats {
    pub id: QueueId,
    #[serde(default)]
    pub name: Option<String>,
    /// Null when the user is not waiting in this queue
    #[serde(default)]
    pub position: Option<u64>,
    pub participant_count: u64,
    pub status: String,
    #[serde(default)]
    pub participants_today: Option<u64>,
}

/// Response of `GET /get_dashboard_data/{queue_id}/`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DashboardStats {
    pub id: QueueId,
    pub current_queue_length: u64,
    pub estimated_wait_time: serde_json::Number,
    pub participants_today: u64,
    pub status: String,
}

/// Client for the polling endpoints
pub struct PollClient {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl PollClient {
    pub fn new(client: Client, base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            request_timeout,
        }
    }

    /// Statistics of a single queue, for its owner's dashboard
    pub async fn fetch_dashboard_data(&self, queue_id: &QueueId) -> Result<DashboardStats, PollError> {
        let url = format!(
            "{}/get_dashboard_data/{}/",
            self.base(),
            urlencoding::encode(queue_id.as_str())
        );
        self.get_json(&url).await
    }

    /// Every queue the viewer participates in
    pub async fn fetch_queue_data(&self) -> Result<Vec<QueueStats>, PollError> {
        let url = format!("{}/get_queue_data/", self.base());
        self.get_json(&url).await
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PollError> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PollError::Timeout
                } else if e.is_connect() {
                    PollError::Unavailable
                } else {
                    PollError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PollError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(PollError::Decode)
    }
}

/// Errors that can occur while polling
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Queue server unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),
}
