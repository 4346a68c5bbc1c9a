//! Queue Server HTTP Clients
//!
//! Request/response side of the dashboard:
//!
//! - **AckClient**: marks notifications as read (`POST /mark-as-read/{id}/`)
//! - **CsrfTokenSource**: supplies the `X-CSRFToken` header value
//! - **PollClient**: one-shot statistics fetches for the polling fallback
//!
//! All clients share one `reqwest::Client` built by [`build_http_client`],
//! so the session cookie and any cookies the server sets are common to the
//! event stream, acknowledgments and polling.

mod ack;
mod csrf;
mod poll;

pub use ack::{AckClient, AckError, CSRF_HEADER};
pub use csrf::{extract_meta_token, CsrfTokenSource, MetaTagToken, StaticToken};
pub use poll::{DashboardStats, PollClient, PollError, QueueStats};

use reqwest::cookie::Jar;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Settings for the shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Session cookie as (name, value), installed for `base_url`
    pub session_cookie: Option<(String, String)>,
}

/// Build the shared HTTP client.
///
/// No total request timeout is set because the event stream response never
/// completes; one-shot requests set their own timeout.
pub fn build_http_client(settings: &HttpSettings) -> Result<Client, ClientError> {
    let url = Url::parse(&settings.base_url).map_err(|e| ClientError::InvalidUrl {
        url: settings.base_url.clone(),
        error: e.to_string(),
    })?;

    let jar = Arc::new(Jar::default());
    if let Some((name, value)) = &settings.session_cookie {
        jar.add_cookie_str(&format!("{}={}", name, value), &url);
    }

    let client = Client::builder()
        .cookie_provider(jar)
        .connect_timeout(settings.connect_timeout)
        .user_agent(concat!("waitline/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(client)
}

/// Errors building the HTTP client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid server URL {url}: {error}")]
    InvalidUrl { url: String, error: String },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}
