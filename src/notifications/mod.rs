//! Turn Notifications
//!
//! Presents "your turn" notifications one at a time and acknowledges them
//! optimistically: the modal closes immediately and the mark-as-read
//! request runs in the background, its outcome only logged.
//!
//! ## States
//!
//! ```text
//!            deliver(n)               acknowledge()
//!   Idle ──────────────▶ Showing(n) ──────────────▶ Idle
//!                          │    ▲
//!                          └────┘ deliver(m): Showing(m)  (overwrite)
//! ```
//!
//! With [`DeliveryPolicy::Queue`], a notification delivered while another is
//! showing waits in a FIFO and is shown after the current one is
//! acknowledged.

mod manager;
mod modal;

pub use manager::{DeliveryPolicy, DisplayState, NotificationManager};
pub use modal::NotificationModal;

use async_trait::async_trait;

use crate::client::AckError;
use crate::stream::NotificationId;

/// Marks notifications as read on the server
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn mark_as_read(&self, id: &NotificationId) -> Result<(), AckError>;
}
