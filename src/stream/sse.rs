//! Server-Sent Events decoder
//!
//! Incremental `text/event-stream` parser. Bytes arrive in arbitrary
//! chunks; complete events are emitted as soon as their terminating blank
//! line has been seen.

use std::time::Duration;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A dispatched event-stream message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
    /// Last event id seen on the stream
    pub id: Option<String>,
}

impl SseEvent {
    /// Whether this is a plain message (no event type, or `message`)
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

/// Incremental decoder for one event stream
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    skip_lf: bool,
    /// Set once the first line has been read; a byte order mark may only
    /// precede it
    past_first_line: bool,
    data: String,
    event: Option<String>,
    last_id: Option<String>,
    reconnect_time: Option<Duration>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the body, returning every event it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();

        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }

            match byte {
                b'\n' => self.end_line(&mut events),
                b'\r' => {
                    self.end_line(&mut events);
                    self.skip_lf = true;
                }
                _ => self.line.push(byte),
            }
        }

        events
    }

    /// Reconnection delay requested by the server via `retry:`
    pub fn reconnect_time(&self) -> Option<Duration> {
        self.reconnect_time
    }

    fn end_line(&mut self, events: &mut Vec<SseEvent>) {
        let raw = std::mem::take(&mut self.line);
        let mut bytes = raw.as_slice();
        if !self.past_first_line {
            self.past_first_line = true;
            bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        }
        let line = String::from_utf8_lossy(bytes);

        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                events.push(event);
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (&*line, ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event = Some(value.to_string()),
            "id" => {
                if !value.contains('\0') {
                    self.last_id = Some(value.to_string());
                }
            }
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.reconnect_time = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();

        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        data.pop();

        Some(SseEvent {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}
