//! # Waitline
//!
//! Live queue dashboard client. Follows a queue server's event stream,
//! keeps queue widgets in sync with the snapshots it pushes and presents
//! "your turn" notifications, acknowledging them when dismissed.
//!
//! ## Features
//!
//! - **Live updates**: Server-Sent Events with bounded exponential reconnect
//! - **Reconciliation**: snapshots projected onto widgets by queue id
//! - **Notifications**: one modal at a time, optimistic acknowledgment
//! - **Polling fallback**: one-shot statistics fetches
//!
//! ## Modules
//!
//! - [`stream`]: event stream transport and wire messages
//! - [`dashboard`]: widget registry and the reconciler
//! - [`notifications`]: notification display state machine
//! - [`client`]: acknowledgment, CSRF and polling HTTP clients
//! - [`session`]: the task that owns all view state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use waitline::client::{build_http_client, AckClient, StaticToken};
//! use waitline::{Config, Dashboard, DashboardSession, NotificationManager, StreamTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let http = build_http_client(&config.http_settings())?;
//!
//!     let ack = AckClient::new(
//!         http.clone(),
//!         config.server.base_url.clone(),
//!         Arc::new(StaticToken::new("token")),
//!         config.request_timeout(),
//!     );
//!     let notifications = NotificationManager::new(Arc::new(ack), config.notifications.delivery);
//!
//!     let mut dashboard = Dashboard::new();
//!     dashboard.mount(7);
//!
//!     let (frames, _transport) = StreamTransport::new(http, config.transport_config()).spawn();
//!     let (_ui_tx, ui) = tokio::sync::mpsc::channel(8);
//!
//!     let mut session = DashboardSession::new(dashboard, notifications);
//!     session
//!         .run(frames, ui, |s| println!("{}", s.dashboard()))
//!         .await;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod dashboard;
pub mod notifications;
pub mod session;
pub mod stream;
pub mod telemetry;

// Re-export top-level types for convenience
pub use stream::{
    Frame, Notification, NotificationId, QueueId, QueueSnapshot, QueueStatus, ReconnectPolicy,
    StreamError, StreamTransport, TransportConfig, TransportExit,
};

pub use dashboard::{Dashboard, Reconciled};

pub use notifications::{
    Acknowledger, DeliveryPolicy, DisplayState, NotificationManager, NotificationModal,
};

pub use client::{AckClient, AckError, PollClient, PollError};

pub use session::{DashboardSession, FrameReport, SessionExit, UiEvent};

pub use config::{Config, ConfigError, LoggingConfig};
