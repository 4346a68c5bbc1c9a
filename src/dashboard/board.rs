//! Dashboard registry
//!
//! Maps queue ids to their widgets. This is the only place view state
//! lives; a queue without a mounted widget is simply not displayed.

use std::collections::BTreeMap;
use std::fmt;

use super::widget::{DashboardSummary, Element, QueueWidget, Slot};
use crate::stream::QueueId;

/// All widgets currently on screen
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    widgets: BTreeMap<QueueId, QueueWidget>,
    summary: DashboardSummary,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a widget with every stream slot, replacing any existing one
    pub fn mount(&mut self, id: impl Into<QueueId>) -> &mut QueueWidget {
        self.mount_widget(id.into(), QueueWidget::full())
    }

    /// Mount a widget with only the given slots
    pub fn mount_partial(&mut self, id: impl Into<QueueId>, slots: &[Slot]) -> &mut QueueWidget {
        self.mount_widget(id.into(), QueueWidget::with_slots(slots))
    }

    fn mount_widget(&mut self, id: QueueId, widget: QueueWidget) -> &mut QueueWidget {
        tracing::debug!(queue_id = %id, "Widget mounted");
        let entry = self.widgets.entry(id).or_default();
        *entry = widget;
        entry
    }

    pub fn unmount(&mut self, id: &QueueId) -> Option<QueueWidget> {
        self.widgets.remove(id)
    }

    /// Mount the single-queue summary panel
    pub fn mount_summary(&mut self) -> &mut DashboardSummary {
        self.summary = DashboardSummary::full();
        &mut self.summary
    }

    pub fn widget(&self, id: &QueueId) -> Option<&QueueWidget> {
        self.widgets.get(id)
    }

    pub fn widget_mut(&mut self, id: &QueueId) -> Option<&mut QueueWidget> {
        self.widgets.get_mut(id)
    }

    pub fn contains(&self, id: &QueueId) -> bool {
        self.widgets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn queue_ids(&self) -> impl Iterator<Item = &QueueId> {
        self.widgets.keys()
    }

    pub fn summary(&self) -> &DashboardSummary {
        &self.summary
    }

    pub fn summary_mut(&mut self) -> &mut DashboardSummary {
        &mut self.summary
    }

    /// Resolve an element id such as `status-7`
    pub fn element(&self, element_id: &str) -> Option<&Element> {
        let (slot, id) = Slot::parse_element_id(element_id)?;
        self.widgets.get(&id)?.slot(slot)
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.summary.is_mounted() {
            let text = |e: &Option<Element>| {
                e.as_ref().map(|e| e.text().to_string()).unwrap_or_default()
            };
            writeln!(
                f,
                "Queue length: {:<6} Wait: {:<10} Today: {:<6} Status: {}",
                text(&self.summary.current_queue_length),
                text(&self.summary.estimated_wait_time),
                text(&self.summary.participants_today),
                text(&self.summary.status),
            )?;
        }

        if self.widgets.is_empty() {
            return Ok(());
        }

        writeln!(
            f,
            "{:<10} {:<10} {:>8} {:>9} {:>12}",
            "QUEUE", "STATUS", "LENGTH", "POSITION", "WAIT"
        )?;
        for (id, widget) in &self.widgets {
            writeln!(
                f,
                "{:<10} {:<10} {:>8} {:>9} {:>12}",
                id.as_str(),
                widget.text(Slot::Status),
                widget.text(Slot::Length),
                widget.text(Slot::Position),
                widget.text(Slot::Estimated),
            )?;
        }
        Ok(())
    }
}
