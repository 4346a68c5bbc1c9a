//! Widget view-model
//!
//! A queue widget is a set of individually addressable elements, each
//! holding display text and a class set. Any element may be absent.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::stream::QueueId;

/// One addressable display element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    text: String,
    classes: BTreeSet<String>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        self.classes.insert(class.into());
    }

    pub fn remove_class(&mut self, class: &str) -> bool {
        self.classes.remove(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }
}

/// Sub-element of a queue widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Status,
    Length,
    Position,
    Estimated,
    ParticipantsToday,
}

impl Slot {
    pub const ALL: [Slot; 5] = [
        Slot::Status,
        Slot::Length,
        Slot::Position,
        Slot::Estimated,
        Slot::ParticipantsToday,
    ];

    /// Slots fed by the data stream
    pub const STREAM: [Slot; 4] = [Slot::Status, Slot::Length, Slot::Position, Slot::Estimated];

    /// Element id prefix; the full id is `{prefix}-{queue_id}`
    pub fn prefix(&self) -> &'static str {
        match self {
            Slot::Status => "status",
            Slot::Length => "length",
            Slot::Position => "position",
            Slot::Estimated => "estimated",
            Slot::ParticipantsToday => "participants-today",
        }
    }

    pub fn element_id(&self, queue: &QueueId) -> String {
        format!("{}-{}", self.prefix(), queue)
    }

    /// Inverse of [`Slot::element_id`]
    pub fn parse_element_id(element_id: &str) -> Option<(Slot, QueueId)> {
        Self::ALL.into_iter().find_map(|slot| {
            element_id
                .strip_prefix(slot.prefix())
                .and_then(|rest| rest.strip_prefix('-'))
                .filter(|id| !id.is_empty())
                .map(|id| (slot, QueueId::from(id)))
        })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// On-screen representation of one queue
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueWidget {
    elements: HashMap<Slot, Element>,
}

impl QueueWidget {
    /// Widget with every stream slot present
    pub fn full() -> Self {
        Self::with_slots(&Slot::STREAM)
    }

    pub fn with_slots(slots: &[Slot]) -> Self {
        Self {
            elements: slots.iter().map(|slot| (*slot, Element::new())).collect(),
        }
    }

    pub fn slot(&self, slot: Slot) -> Option<&Element> {
        self.elements.get(&slot)
    }

    pub fn slot_mut(&mut self, slot: Slot) -> Option<&mut Element> {
        self.elements.get_mut(&slot)
    }

    pub fn has_slot(&self, slot: Slot) -> bool {
        self.elements.contains_key(&slot)
    }

    /// Text of a slot, empty when absent
    pub fn text(&self, slot: Slot) -> &str {
        self.slot(slot).map(Element::text).unwrap_or("")
    }
}

/// Single-queue statistics panel of the queue owner's dashboard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSummary {
    pub current_queue_length: Option<Element>,
    pub estimated_wait_time: Option<Element>,
    pub participants_today: Option<Element>,
    pub status: Option<Element>,
}

impl DashboardSummary {
    /// Summary with every element present
    pub fn full() -> Self {
        Self {
            current_queue_length: Some(Element::new()),
            estimated_wait_time: Some(Element::new()),
            participants_today: Some(Element::new()),
            status: Some(Element::new()),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.current_queue_length.is_some()
            || self.estimated_wait_time.is_some()
            || self.participants_today.is_some()
            || self.status.is_some()
    }
}
