//! Acknowledgment Client
//!
//! Marks a notification as read on the queue server. One attempt per
//! call: no retry, no backoff, no queuing.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::csrf::CsrfTokenSource;
use crate::notifications::Acknowledger;
use crate::stream::NotificationId;

/// Header carrying the anti-forgery token
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Client for `POST /mark-as-read/{id}/`
pub struct AckClient {
    client: Client,
    base_url: String,
    csrf: Arc<dyn CsrfTokenSource>,
    request_timeout: Duration,
}

impl AckClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        csrf: Arc<dyn CsrfTokenSource>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            csrf,
            request_timeout,
        }
    }

    /// Endpoint for a notification id
    pub fn endpoint(&self, id: &NotificationId) -> String {
        format!(
            "{}/mark-as-read/{}/",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(id.as_str())
        )
    }

    /// Issue the acknowledgment request; any 2xx is success
    pub async fn mark_as_read(&self, id: &NotificationId) -> Result<(), AckError> {
        let token = self.csrf.token().await?;
        let url = self.endpoint(id);

        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .header(CONTENT_TYPE, "application/json")
            .header(CSRF_HEADER, token)
            .body("{}")
            .send()
            .await
            .map_err(AckError::from_request)?;

        if response.status().is_success() {
            tracing::debug!(notification_id = %id, "Notification marked as read");
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(AckError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl Acknowledger for AckClient {
    async fn mark_as_read(&self, id: &NotificationId) -> Result<(), AckError> {
        AckClient::mark_as_read(self, id).await
    }
}

/// Errors that can occur when acknowledging a notification
#[derive(Error, Debug)]
pub enum AckError {
    #[error("Queue server unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("No CSRF token found at {0}")]
    MissingToken(String),
}

impl AckError {
    pub(crate) fn from_request(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AckError::Timeout
        } else if e.is_connect() {
            AckError::Unavailable
        } else {
            AckError::Request(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StaticToken;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<(String, Option<String>, Option<String>)>>>;

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn record(
        State(seen): State<Seen>,
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> StatusCode {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        seen.lock()
            .unwrap()
            .push((id.clone(), header("x-csrftoken"), header("content-type")));

        if id == "404" {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        }
    }

    fn client(base: &str) -> AckClient {
        AckClient::new(
            Client::new(),
            base,
            Arc::new(StaticToken::new("tok-123")),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_endpoint() {
        let ack = client("http://localhost:8000/");
        assert_eq!(
            ack.endpoint(&NotificationId::from(9)),
            "http://localhost:8000/mark-as-read/9/"
        );
        assert_eq!(
            ack.endpoint(&NotificationId::from("a/b")),
            "http://localhost:8000/mark-as-read/a%2Fb/"
        );
    }

    #[tokio::test]
    async fn test_mark_as_read_sends_token_and_content_type() {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route("/mark-as-read/:id/", post(record))
            .with_state(Arc::clone(&seen));
        let base = spawn_server(router).await;

        client(&base)
            .mark_as_read(&NotificationId::from(9))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "9");
        assert_eq!(seen[0].1.as_deref(), Some("tok-123"));
        assert_eq!(seen[0].2.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_non_success_is_reported() {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route("/mark-as-read/:id/", post(record))
            .with_state(Arc::clone(&seen));
        let base = spawn_server(router).await;

        let err = client(&base)
            .mark_as_read(&NotificationId::from(404))
            .await
            .unwrap_err();
        assert!(matches!(err, AckError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}", addr))
            .mark_as_read(&NotificationId::from(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AckError::Unavailable));
    }
}
