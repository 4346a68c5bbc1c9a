//! Event Stream Message Types
//!
//! Defines the payloads pushed by the queue server over the data stream:
//! per-queue snapshots and turn notifications, bundled into frames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier as it appears on the wire (the server sends integers,
/// but any string is accepted)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{}", n),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
        #[serde(from = "RawId", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<RawId> for $name {
            fn from(raw: RawId) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Stable identifier of a queue, used to address its widget
    QueueId
);

opaque_id!(
    /// Identifier of a turn notification, used for acknowledgment
    NotificationId
);

/// Load level of a queue, projected onto the widget as a status class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    Normal,
    Busy,
    Full,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 3] = [QueueStatus::Normal, QueueStatus::Busy, QueueStatus::Full];

    /// Case-insensitive exact match; anything else is unrecognized
    pub fn parse(status: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(status))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Normal => "normal",
            QueueStatus::Busy => "busy",
            QueueStatus::Full => "full",
        }
    }

    /// Visual class applied to the status element
    pub fn css_class(&self) -> &'static str {
        match self {
            QueueStatus::Normal => "status-normal",
            QueueStatus::Busy => "status-busy",
            QueueStatus::Full => "status-full",
        }
    }
}

/// Authoritative state of one queue at the time a frame was sent
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueueSnapshot {
    pub id: QueueId,
    /// Queue display name (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Status label as sent by the server, e.g. "Busy"
    pub status: String,
    pub participant_count: u64,
    /// Position of the viewer in this queue
    pub position: u64,
    /// Minutes; kept as the exact JSON number so it renders unchanged
    pub estimated_wait_time: serde_json::Number,
}

impl QueueSnapshot {
    pub fn queue_status(&self) -> Option<QueueStatus> {
        QueueStatus::parse(&self.status)
    }
}

/// "Your turn" notification for one of the viewer's queues
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub queue_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<QueueId>,
    /// Server-side message text (logged, not displayed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Notification {
    pub fn new(id: impl Into<NotificationId>, queue_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            queue_name: queue_name.into(),
            queue_id: None,
            message: None,
            created_at: None,
        }
    }

    pub fn for_queue(mut self, queue_id: impl Into<QueueId>) -> Self {
        self.queue_id = Some(queue_id.into());
        self
    }

    /// Text shown in the notification modal
    pub fn display_message(&self) -> String {
        format!(
            "Your turn for {} is ready! Please proceed to the counter.",
            self.queue_name
        )
    }
}

/// One message of the data stream
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Frame {
    #[serde(default)]
    pub queues: Vec<QueueSnapshot>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty() && self.notifications.is_empty()
    }
}

/// Decoded data of a stream event
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPayload {
    Frame(Frame),
    /// `{"error": "..."}`, sent by the server right before it ends the stream
    ServerError(String),
}

impl StreamPayload {
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(data)?;

        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return Ok(StreamPayload::ServerError(message.to_string()));
        }

        Ok(StreamPayload::Frame(serde_json::from_value(value)?))
    }
}
