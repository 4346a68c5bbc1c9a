//! Real-Time Data Stream
//!
//! Consumes the server's Server-Sent Events channel, which pushes the
//! viewer's queue snapshots and unread turn notifications.
//!
//! ## Architecture
//!
//! - **SseDecoder**: incremental `text/event-stream` parser
//! - **StreamTransport**: owns the connection and the reconnect policy,
//!   forwards decoded frames over an mpsc channel
//! - **Messages**: frame, snapshot and notification payloads
//!
//! ## Wire format
//!
//! Each message event carries one JSON frame:
//!
//! ```json
//! {
//!   "queues": [{"id": 7, "status": "Busy", "participant_count": 4,
//!               "position": 2, "estimated_wait_time": 15}],
//!   "notifications": [{"id": 9, "queue_name": "Pharmacy", "queue_id": 7}]
//! }
//! ```
//!
//! A frame of the form `{"error": "..."}` reports a server-side failure;
//! it is logged and dropped.

mod error;
mod messages;
mod sse;
mod transport;

pub use error::StreamError;
pub use messages::{
    Frame, Notification, NotificationId, QueueId, QueueSnapshot, QueueStatus, RawId,
    StreamPayload,
};
pub use sse::{SseDecoder, SseEvent};
pub use transport::{ReconnectPolicy, StreamTransport, TransportConfig, TransportExit};
