//! Anti-forgery token sources
//!
//! The queue server expects an `X-CSRFToken` header on state-changing
//! requests. The token is either configured up front or read from the
//! `<meta name="csrf-token">` tag of a page the server renders.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tokio::sync::OnceCell;

use super::ack::AckError;

/// Supplies the per-session anti-forgery token
#[async_trait]
pub trait CsrfTokenSource: Send + Sync {
    async fn token(&self) -> Result<String, AckError>;
}

/// A token known ahead of time
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CsrfTokenSource for StaticToken {
    async fn token(&self) -> Result<String, AckError> {
        Ok(self.0.clone())
    }
}

/// Token scraped from a server-rendered page, fetched once per session
pub struct MetaTagToken {
    client: Client,
    page_url: String,
    cached: OnceCell<String>,
}

impl MetaTagToken {
    /// `client` should share its cookie jar with the acknowledgment client
    /// so the token matches the session cookie
    pub fn new(client: Client, page_url: impl Into<String>) -> Self {
        Self {
            client,
            page_url: page_url.into(),
            cached: OnceCell::new(),
        }
    }

    async fn fetch(&self) -> Result<String, AckError> {
        let response = self
            .client
            .get(&self.page_url)
            .send()
            .await
            .map_err(AckError::from_request)?;

        if !response.status().is_success() {
            return Err(AckError::Api {
                status: response.status().as_u16(),
                message: format!("Failed to load {}", self.page_url),
            });
        }

        let html = response.text().await.map_err(AckError::from_request)?;
        let token = extract_meta_token(&html)
            .ok_or_else(|| AckError::MissingToken(self.page_url.clone()))?;

        tracing::debug!(page = %self.page_url, "CSRF token loaded");
        Ok(token)
    }
}

#[async_trait]
impl CsrfTokenSource for MetaTagToken {
    async fn token(&self) -> Result<String, AckError> {
        self.cached
            .get_or_try_init(|| self.fetch())
            .await
            .cloned()
    }
}

/// Extract the `content` of `<meta name="csrf-token" content="...">`
pub fn extract_meta_token(html: &str) -> Option<String> {
    let tag_re = Regex::new(r"(?i)<meta\b([^>]*)>").ok()?;
    // Name must follow whitespace or '/', so `data-name` is not `name`
    let attr_re = Regex::new(
        r#"(?i)(?:^|[\s/])([a-z_:][-a-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`/]+)))?"#,
    )
    .ok()?;

    let token = tag_re.captures_iter(html).find_map(|tag| {
        let attrs = tag.get(1).map_or("", |m| m.as_str());
        let mut name = None;
        let mut content = None;

        for attr in attr_re.captures_iter(attrs) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map_or("", |m| m.as_str());

            match attr[1].to_ascii_lowercase().as_str() {
                "name" => name = Some(value),
                "content" => content = Some(value),
                _ => {}
            }
        }

        match (name, content) {
            (Some(name), Some(content)) if name.eq_ignore_ascii_case("csrf-token") => {
                Some(content.to_string())
            }
            _ => None,
        }
    });
    token
}
