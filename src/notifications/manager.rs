//! Notification Manager
//!
//! Owns the displayed-notification state. `deliver` and `acknowledge` are
//! the only operations that change it.

use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::modal::NotificationModal;
use super::Acknowledger;
use crate::stream::Notification;

/// How a notification delivered while another is showing is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryPolicy {
    /// Replace the showing notification; only the latest stays acknowledgeable
    #[default]
    Overwrite,
    /// Keep later notifications in a FIFO and show them one at a time
    Queue,
}

/// Displayed-notification state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DisplayState {
    #[default]
    Idle,
    Showing(Notification),
}

/// At-most-one-visible notification state machine
pub struct NotificationManager {
    state: DisplayState,
    pending: VecDeque<Notification>,
    policy: DeliveryPolicy,
    modal: NotificationModal,
    acknowledger: Arc<dyn Acknowledger>,
}

impl NotificationManager {
    pub fn new(acknowledger: Arc<dyn Acknowledger>, policy: DeliveryPolicy) -> Self {
        Self {
            state: DisplayState::Idle,
            pending: VecDeque::new(),
            policy,
            modal: NotificationModal::default(),
            acknowledger,
        }
    }

    /// Present a notification
    pub fn deliver(&mut self, notification: Notification) {
        tracing::info!(
            notification_id = %notification.id,
            queue = %notification.queue_name,
            message = notification.message.as_deref().unwrap_or(""),
            "Notification received"
        );

        match (&self.state, self.policy) {
            (DisplayState::Showing(current), DeliveryPolicy::Queue) => {
                let known = current.id == notification.id
                    || self.pending.iter().any(|n| n.id == notification.id);
                if !known {
                    self.pending.push_back(notification);
                }
            }
            (DisplayState::Showing(current), DeliveryPolicy::Overwrite) => {
                if current.id != notification.id {
                    tracing::debug!(
                        replaced = %current.id,
                        notification_id = %notification.id,
                        "Showing notification replaced"
                    );
                }
                self.show(notification);
            }
            (DisplayState::Idle, _) => self.show(notification),
        }
    }

    /// Acknowledge the showing notification.
    ///
    /// Starts the mark-as-read request without waiting for it, then clears
    /// the state and hides the modal. Returns the request task, or `None`
    /// when nothing was showing. Must be called within a tokio runtime.
    pub fn acknowledge(&mut self) -> Option<JoinHandle<()>> {
        let DisplayState::Showing(notification) = &self.state else {
            tracing::debug!("Acknowledge with no notification showing, ignored");
            return None;
        };

        let id = notification.id.clone();
        let acknowledger = Arc::clone(&self.acknowledger);
        let request = tokio::spawn(async move {
            match acknowledger.mark_as_read(&id).await {
                Ok(()) => tracing::info!(notification_id = %id, "Notification marked as read"),
                Err(e) => tracing::warn!(
                    notification_id = %id,
                    error = %e,
                    "Failed to mark notification as read"
                ),
            }
        });

        self.state = DisplayState::Idle;
        self.modal.hide();

        if let Some(next) = self.pending.pop_front() {
            self.show(next);
        }

        Some(request)
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// The notification currently showing, if any
    pub fn showing(&self) -> Option<&Notification> {
        match &self.state {
            DisplayState::Showing(notification) => Some(notification),
            DisplayState::Idle => None,
        }
    }

    pub fn modal(&self) -> &NotificationModal {
        &self.modal
    }

    /// Notifications waiting behind the showing one
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    fn show(&mut self, notification: Notification) {
        self.modal.show(&notification);
        self.state = DisplayState::Showing(notification);
    }
}
