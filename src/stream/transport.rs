//! Event Stream Transport
//!
//! Owns the single long-lived connection to the server's data stream,
//! decodes events into frames and hands them to the session over a
//! channel. Reconnection is governed by [`ReconnectPolicy`].

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::StreamError;
use super::messages::{Frame, StreamPayload};
use super::sse::SseDecoder;

/// What to do once a connection fails or the server ends the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Log and close permanently
    Never,
    /// Reconnect with exponential backoff, giving up after
    /// `max_attempts` consecutive failures
    Backoff {
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Backoff {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (0-based), or `None`
    /// when no further attempt should be made.
    ///
    /// `server_hint` is the `retry:` value announced by the server and, when
    /// present, replaces the configured initial delay.
    pub fn delay_for(&self, attempt: u32, server_hint: Option<Duration>) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Never => None,
            ReconnectPolicy::Backoff {
                max_attempts,
                initial_delay,
                max_delay,
            } => {
                if attempt >= max_attempts {
                    return None;
                }
                let base = server_hint.unwrap_or(initial_delay);
                Some(base.saturating_mul(2u32.saturating_pow(attempt)).min(max_delay))
            }
        }
    }
}

/// Configuration for the stream transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Full URL of the data stream endpoint
    pub url: String,
    pub policy: ReconnectPolicy,
    /// Capacity of the decoded-frame channel
    pub channel_capacity: usize,
}

impl TransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            policy: ReconnectPolicy::default(),
            channel_capacity: 64,
        }
    }

    pub fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Why the transport task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportExit {
    /// The frame receiver was dropped
    ReceiverDropped,
    /// The connection ended and the policy forbids reconnecting
    Closed,
    /// Backoff gave up after this many consecutive failures
    RetriesExhausted { attempts: u32 },
}

/// How a single connection ended without a transport error
enum ConnectionEnd {
    EndOfStream,
    ReceiverDropped,
}

/// What one connection delivered before it ended
#[derive(Debug, Default)]
struct ConnectionStats {
    frames: u64,
    server_errors: u64,
}

impl ConnectionStats {
    /// Only a connection that produced data and no server error clears
    /// the failure count
    fn is_healthy(&self) -> bool {
        self.frames > 0 && self.server_errors == 0
    }
}

/// Single persistent connection to the data stream
pub struct StreamTransport {
    client: Client,
    config: TransportConfig,
}

impl StreamTransport {
    /// `client` must not carry a total request timeout, or the
    /// long-lived response would be cut off
    pub fn new(client: Client, config: TransportConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Run the transport on its own task, returning the frame receiver
    pub fn spawn(self) -> (mpsc::Receiver<Frame>, JoinHandle<TransportExit>) {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    /// Connect, forward frames and apply the reconnect policy until the
    /// policy or the receiver ends the loop
    pub async fn run(self, tx: mpsc::Sender<Frame>) -> TransportExit {
        let mut failures: u32 = 0;
        let mut retry_hint: Option<Duration> = None;

        loop {
            let mut stats = ConnectionStats::default();
            let outcome = match self.connect().await {
                Ok(response) => {
                    tracing::info!(url = %self.config.url, "Event stream connected");
                    self.pump(response, &tx, &mut retry_hint, &mut stats).await
                }
                Err(e) => Err(e),
            };

            if stats.is_healthy() {
                failures = 0;
            } else {
                tracing::debug!(
                    frames = stats.frames,
                    server_errors = stats.server_errors,
                    "Connection counted as failed"
                );
            }

            match outcome {
                Ok(ConnectionEnd::ReceiverDropped) => {
                    tracing::debug!("Frame receiver dropped, stopping event stream");
                    return TransportExit::ReceiverDropped;
                }
                Ok(ConnectionEnd::EndOfStream) => {
                    tracing::info!(url = %self.config.url, "Event stream ended by server");
                }
                Err(e) => {
                    tracing::error!(url = %self.config.url, error = %e, "Event stream error");
                }
            }

            let Some(delay) = self.config.policy.delay_for(failures, retry_hint) else {
                return match self.config.policy {
                    ReconnectPolicy::Never => {
                        tracing::warn!("Event stream closed, reconnection disabled");
                        TransportExit::Closed
                    }
                    ReconnectPolicy::Backoff { .. } => {
                        tracing::error!(attempts = failures, "Max reconnect attempts reached");
                        TransportExit::RetriesExhausted { attempts: failures }
                    }
                };
            };

            failures += 1;
            tracing::info!(
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to event stream"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = tx.closed() => return TransportExit::ReceiverDropped,
            }
        }
    }

    async fn connect(&self) -> Result<reqwest::Response, StreamError> {
        let response = self
            .client
            .get(&self.config.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(StreamError::Connect)?;

        if !response.status().is_success() {
            return Err(StreamError::Status(response.status().as_u16()));
        }

        Ok(response)
    }

    /// Read one connection to its end, forwarding every decoded frame
    async fn pump(
        &self,
        response: reqwest::Response,
        tx: &mpsc::Sender<Frame>,
        retry_hint: &mut Option<Duration>,
        stats: &mut ConnectionStats,
    ) -> Result<ConnectionEnd, StreamError> {
        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();

        loop {
            let chunk = tokio::select! {
                chunk = body.next() => chunk,
                _ = tx.closed() => return Ok(ConnectionEnd::ReceiverDropped),
            };

            let Some(chunk) = chunk else {
                return Ok(ConnectionEnd::EndOfStream);
            };
            let chunk = chunk.map_err(StreamError::Body)?;

            for event in decoder.feed(&chunk) {
                if !event.is_message() {
                    tracing::debug!(event = ?event.event, "Ignoring non-message event");
                    continue;
                }

                match StreamPayload::parse(&event.data) {
                    Ok(StreamPayload::Frame(frame)) => {
                        tracing::trace!(
                            queues = frame.queues.len(),
                            notifications = frame.notifications.len(),
                            "Frame received"
                        );
                        stats.frames += 1;
                        if tx.send(frame).await.is_err() {
                            return Ok(ConnectionEnd::ReceiverDropped);
                        }
                    }
                    Ok(StreamPayload::ServerError(message)) => {
                        stats.server_errors += 1;
                        tracing::error!(message = %message, "Server reported stream error");
                    }
                    Err(e) => {
                        let err = StreamError::from(e);
                        tracing::warn!(error = %err, "Dropping malformed frame");
                    }
                }
            }

            if decoder.reconnect_time().is_some() {
                *retry_hint = decoder.reconnect_time();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::header, http::StatusCode, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const FRAME_A: &str = r#"{"queues":[{"id":7,"status":"Busy","participant_count":4,"position":2,"estimated_wait_time":15}],"notifications":[]}"#;
    const FRAME_B: &str = r#"{"queues":[],"notifications":[{"id":9,"queue_name":"Pharmacy","queue_id":7}]}"#;

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn event_stream(body: String) -> ([(header::HeaderName, &'static str); 1], String) {
        ([(header::CONTENT_TYPE, "text/event-stream")], body)
    }

    fn fast_backoff(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy::Backoff {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_never_policy_has_no_delay() {
        assert_eq!(ReconnectPolicy::Never.delay_for(0, None), None);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0, None), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for(1, None), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_for(4, None), Some(Duration::from_secs(16)));
        assert_eq!(policy.delay_for(5, None), None);

        let long = ReconnectPolicy::Backoff {
            max_attempts: 100,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(long.delay_for(10, None), Some(Duration::from_secs(30)));
        assert_eq!(long.delay_for(64, None), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_backoff_uses_server_hint() {
        let policy = ReconnectPolicy::default();
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_millis(500))),
            Some(Duration::from_secs(1))
        );
    }

    #[tokio::test]
    async fn test_frames_forwarded_in_order_and_bad_events_dropped() {
        let body = format!(
            ": hello\n\ndata: {}\n\ndata: not json\n\nevent: ping\ndata: {{}}\n\ndata: {}\n\ndata: {{\"error\": \"Internal server error\"}}\n\n",
            FRAME_A, FRAME_B
        );
        let router = Router::new().route(
            "/api/data-stream/",
            get(move || {
                let body = body.clone();
                async move { event_stream(body) }
            }),
        );
        let base = spawn_server(router).await;

        let config = TransportConfig::new(format!("{}/api/data-stream/", base))
            .policy(ReconnectPolicy::Never);
        let (mut rx, handle) = StreamTransport::new(Client::new(), config).spawn();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.queues[0].id.as_str(), "7");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.notifications[0].id.as_str(), "9");

        assert!(rx.recv().await.is_none());
        assert_eq!(handle.await.unwrap(), TransportExit::Closed);
    }

    #[tokio::test]
    async fn test_connect_failure_with_never_policy_closes() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = TransportConfig::new(format!("http://{}/api/data-stream/", addr))
            .policy(ReconnectPolicy::Never);
        let (mut rx, handle) = StreamTransport::new(Client::new(), config).spawn();

        assert!(rx.recv().await.is_none());
        assert_eq!(handle.await.unwrap(), TransportExit::Closed);
    }

    #[tokio::test]
    async fn test_backoff_gives_up_after_consecutive_failures() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/data-stream/",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::INTERNAL_SERVER_ERROR
                }),
            )
            .with_state(Arc::clone(&hits));
        let base = spawn_server(router).await;

        let config =
            TransportConfig::new(format!("{}/api/data-stream/", base)).policy(fast_backoff(2));
        let (mut rx, handle) = StreamTransport::new(Client::new(), config).spawn();

        assert!(rx.recv().await.is_none());
        assert_eq!(
            handle.await.unwrap(),
            TransportExit::RetriesExhausted { attempts: 2 }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_backoff_reconnects_after_stream_ends() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/data-stream/",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    event_stream(format!("data: {}\n\n", FRAME_A))
                }),
            )
            .with_state(Arc::clone(&hits));
        let base = spawn_server(router).await;

        let config =
            TransportConfig::new(format!("{}/api/data-stream/", base)).policy(fast_backoff(1));
        let (mut rx, handle) = StreamTransport::new(Client::new(), config).spawn();

        // Each connection delivers a frame, so the failure counter keeps resetting
        for _ in 0..3 {
            let frame = rx.recv().await.unwrap();
            assert_eq!(frame.queues.len(), 1);
        }
        assert!(hits.load(Ordering::SeqCst) >= 3);

        drop(rx);
        assert_eq!(handle.await.unwrap(), TransportExit::ReceiverDropped);
    }

    #[tokio::test]
    async fn test_error_only_connections_exhaust_retries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/data-stream/",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    event_stream("data: {\"error\":\"Internal server error\"}\n\n".to_string())
                }),
            )
            .with_state(Arc::clone(&hits));
        let base = spawn_server(router).await;

        let config =
            TransportConfig::new(format!("{}/api/data-stream/", base)).policy(fast_backoff(2));
        let (mut rx, handle) = StreamTransport::new(Client::new(), config).spawn();

        assert!(rx.recv().await.is_none());
        assert_eq!(
            handle.await.unwrap(),
            TransportExit::RetriesExhausted { attempts: 2 }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_connections_exhaust_retries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/data-stream/",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    event_stream(": keep-alive\n\n".to_string())
                }),
            )
            .with_state(Arc::clone(&hits));
        let base = spawn_server(router).await;

        let config =
            TransportConfig::new(format!("{}/api/data-stream/", base)).policy(fast_backoff(1));
        let (mut rx, handle) = StreamTransport::new(Client::new(), config).spawn();

        assert!(rx.recv().await.is_none());
        assert_eq!(
            handle.await.unwrap(),
            TransportExit::RetriesExhausted { attempts: 1 }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
