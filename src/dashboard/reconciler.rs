//! Queue State Reconciler
//!
//! Projects snapshots onto widgets. Stateless and idempotent: a snapshot
//! is always applied in full, never diffed against what is on screen.

use super::board::Dashboard;
use super::widget::{Element, QueueWidget, Slot};
use crate::client::{DashboardStats, QueueStats};
use crate::stream::{QueueId, QueueSnapshot, QueueStatus};

/// Unit suffix of the wait time on queue widgets
pub const WAIT_UNIT: &str = "minute";

/// Unit suffix of the wait time on the dashboard summary
pub const SUMMARY_WAIT_UNIT: &str = "min";

/// Result of applying one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// Every targeted element was updated
    Applied,
    /// The widget exists but lacks some elements; the rest were updated
    Partial { missing: Vec<Slot> },
    /// No widget for this queue; nothing changed
    UnknownQueue,
}

impl Reconciled {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Reconciled::UnknownQueue)
    }
}

/// Set the status text and make the matching status class the only one.
///
/// Unrecognized statuses update the text and leave no status class.
/// Unrelated classes are preserved.
pub fn project_status(element: &mut Element, status: &str) {
    element.set_text(status);

    for candidate in QueueStatus::ALL {
        element.remove_class(candidate.css_class());
    }

    if let Some(status) = QueueStatus::parse(status) {
        element.add_class(status.css_class());
    } else {
        tracing::debug!(status = %status, "Unrecognized queue status, no class applied");
    }
}

/// Apply a stream snapshot to the widget of `snapshot.id`
pub fn apply_snapshot(dashboard: &mut Dashboard, snapshot: &QueueSnapshot) -> Reconciled {
    let writes = [
        (Slot::Length, snapshot.participant_count.to_string()),
        (Slot::Position, snapshot.position.to_string()),
        (
            Slot::Estimated,
            format!("{} {}", snapshot.estimated_wait_time, WAIT_UNIT),
        ),
    ];

    apply(dashboard, &snapshot.id, &snapshot.status, writes)
}

/// Apply one entry of the polled queue list
pub fn apply_queue_stats(dashboard: &mut Dashboard, stats: &QueueStats) -> Reconciled {
    let mut writes = vec![
        (Slot::Length, stats.participant_count.to_string()),
        (
            Slot::Position,
            stats.position.map(|p| p.to_string()).unwrap_or_default(),
        ),
    ];
    if let Some(today) = stats.participants_today {
        writes.push((Slot::ParticipantsToday, today.to_string()));
    }

    apply(dashboard, &stats.id, &stats.status, writes)
}

/// Apply polled single-queue statistics to the summary panel.
///
/// Returns the number of elements updated; absent elements are skipped.
pub fn apply_dashboard_stats(dashboard: &mut Dashboard, stats: &DashboardStats) -> usize {
    let summary = dashboard.summary_mut();
    let mut updated = 0;

    let mut write = |element: &mut Option<Element>, text: String| {
        if let Some(element) = element {
            element.set_text(text);
            updated += 1;
        }
    };

    write(
        &mut summary.current_queue_length,
        stats.current_queue_length.to_string(),
    );
    write(
        &mut summary.estimated_wait_time,
        format!("{} {}", stats.estimated_wait_time, SUMMARY_WAIT_UNIT),
    );
    write(
        &mut summary.participants_today,
        stats.participants_today.to_string(),
    );
    write(&mut summary.status, stats.status.clone());

    if updated == 0 {
        tracing::debug!(queue_id = %stats.id, "No summary panel mounted, stats skipped");
    }
    updated
}

fn apply<I>(dashboard: &mut Dashboard, id: &QueueId, status: &str, writes: I) -> Reconciled
where
    I: IntoIterator<Item = (Slot, String)>,
{
    let Some(widget) = dashboard.widget_mut(id) else {
        tracing::debug!(queue_id = %id, "No widget for queue, update skipped");
        return Reconciled::UnknownQueue;
    };

    let mut missing = Vec::new();

    match widget.slot_mut(Slot::Status) {
        Some(element) => project_status(element, status),
        None => missing.push(Slot::Status),
    }

    for (slot, text) in writes {
        write_slot(widget, slot, text, &mut missing);
    }

    if missing.is_empty() {
        Reconciled::Applied
    } else {
        tracing::debug!(queue_id = %id, missing = ?missing, "Widget elements missing, skipped");
        Reconciled::Partial { missing }
    }
}

fn write_slot(widget: &mut QueueWidget, slot: Slot, text: String, missing: &mut Vec<Slot>) {
    match widget.slot_mut(slot) {
        Some(element) => element.set_text(text),
        None => missing.push(slot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: u64, status: &str) -> QueueSnapshot {
        QueueSnapshot {
            id: QueueId::from(id),
            name: None,
            status: status.to_string(),
            participant_count: 4,
            position: 2,
            estimated_wait_time: serde_json::Number::from(15u64),
        }
    }

    fn status_classes(dashboard: &Dashboard, id: u64) -> Vec<String> {
        let element = dashboard
            .element(&Slot::Status.element_id(&QueueId::from(id)))
            .unwrap();
        element
            .classes()
            .filter(|c| c.starts_with("status-"))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_busy_snapshot_end_to_end() {
        let mut dashboard = Dashboard::new();
        dashboard.mount(7);

        let outcome = apply_snapshot(&mut dashboard, &snapshot(7, "Busy"));
        assert_eq!(outcome, Reconciled::Applied);

        let status = dashboard.element("status-7").unwrap();
        assert_eq!(status.text(), "Busy");
        assert!(status.has_class("status-busy"));
        assert_eq!(dashboard.element("length-7").unwrap().text(), "4");
        assert_eq!(dashboard.element("position-7").unwrap().text(), "2");
        assert_eq!(dashboard.element("estimated-7").unwrap().text(), "15 minute");
    }

    #[test]
    fn test_exactly_one_status_class_for_any_casing() {
        let mut dashboard = Dashboard::new();
        dashboard.mount(1);

        for status in ["normal", "BUSY", "Full", "nOrMaL", "busy", "FULL"] {
            apply_snapshot(&mut dashboard, &snapshot(1, status));
            let expected = format!("status-{}", status.to_lowercase());
            assert_eq!(status_classes(&dashboard, 1), vec![expected]);
        }
    }

    #[test]
    fn test_unrecognized_status_sets_text_without_class() {
        let mut dashboard = Dashboard::new();
        dashboard.mount(1);
        apply_snapshot(&mut dashboard, &snapshot(1, "Busy"));

        let outcome = apply_snapshot(&mut dashboard, &snapshot(1, "Closed"));
        assert_eq!(outcome, Reconciled::Applied);
        assert_eq!(dashboard.element("status-1").unwrap().text(), "Closed");
        assert!(status_classes(&dashboard, 1).is_empty());
    }

    #[test]
    fn test_unrelated_classes_preserved() {
        let mut dashboard = Dashboard::new();
        dashboard
            .mount(1)
            .slot_mut(Slot::Status)
            .unwrap()
            .add_class("badge");

        apply_snapshot(&mut dashboard, &snapshot(1, "full"));
        let status = dashboard.element("status-1").unwrap();
        assert!(status.has_class("badge"));
        assert!(status.has_class("status-full"));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut once = Dashboard::new();
        once.mount(3);
        apply_snapshot(&mut once, &snapshot(3, "Busy"));

        let mut twice = Dashboard::new();
        twice.mount(3);
        apply_snapshot(&mut twice, &snapshot(3, "Busy"));
        apply_snapshot(&mut twice, &snapshot(3, "Busy"));

        assert_eq!(
            once.widget(&QueueId::from(3)),
            twice.widget(&QueueId::from(3))
        );
    }

    #[test]
    fn test_unknown_queue_is_noop() {
        let mut dashboard = Dashboard::new();
        dashboard.mount(1);
        apply_snapshot(&mut dashboard, &snapshot(1, "normal"));
        let before = dashboard.widget(&QueueId::from(1)).cloned();

        let outcome = apply_snapshot(&mut dashboard, &snapshot(99, "full"));
        assert_eq!(outcome, Reconciled::UnknownQueue);
        assert!(!outcome.is_applied());
        assert_eq!(dashboard.len(), 1);
        assert_eq!(dashboard.widget(&QueueId::from(1)).cloned(), before);
    }

    #[test]
    fn test_missing_elements_degrade_gracefully() {
        let mut dashboard = Dashboard::new();
        dashboard.mount_partial(5, &[Slot::Position]);

        let outcome = apply_snapshot(&mut dashboard, &snapshot(5, "busy"));
        assert_eq!(
            outcome,
            Reconciled::Partial {
                missing: vec![Slot::Status, Slot::Length, Slot::Estimated]
            }
        );
        assert_eq!(dashboard.element("position-5").unwrap().text(), "2");
    }

    #[test]
    fn test_numbers_written_as_is() {
        let mut dashboard = Dashboard::new();
        dashboard.mount(2);

        let mut snap = snapshot(2, "normal");
        snap.estimated_wait_time = serde_json::Number::from_f64(7.5).unwrap();
        snap.participant_count = 1_000_000;
        apply_snapshot(&mut dashboard, &snap);

        assert_eq!(dashboard.element("estimated-2").unwrap().text(), "7.5 minute");
        assert_eq!(dashboard.element("length-2").unwrap().text(), "1000000");
    }

    #[test]
    fn test_apply_queue_stats() {
        let mut dashboard = Dashboard::new();
        dashboard.mount_partial(
            4,
            &[Slot::Status, Slot::Length, Slot::Position, Slot::ParticipantsToday],
        );

        let stats = QueueStats {
            id: QueueId::from(4),
            name: Some("Bank".to_string()),
            position: Some(3),
            participant_count: 10,
            status: "Normal".to_string(),
            participants_today: Some(25),
        };
        assert_eq!(apply_queue_stats(&mut dashboard, &stats), Reconciled::Applied);

        let widget = dashboard.widget(&QueueId::from(4)).unwrap();
        assert_eq!(widget.text(Slot::Position), "3");
        assert_eq!(widget.text(Slot::Length), "10");
        assert_eq!(widget.text(Slot::ParticipantsToday), "25");
        assert!(widget.slot(Slot::Status).unwrap().has_class("status-normal"));
    }

    #[test]
    fn test_apply_queue_stats_without_position() {
        let mut dashboard = Dashboard::new();
        dashboard
            .mount(4)
            .slot_mut(Slot::Position)
            .unwrap()
            .set_text("7");

        let stats: QueueStats = serde_json::from_str(
            r#"{"id": 4, "position": null, "participant_count": 2, "status": "Busy"}"#,
        )
        .unwrap();
        assert_eq!(apply_queue_stats(&mut dashboard, &stats), Reconciled::Applied);

        let widget = dashboard.widget(&QueueId::from(4)).unwrap();
        assert_eq!(widget.text(Slot::Position), "");
        assert_eq!(widget.text(Slot::Length), "2");
    }

    #[test]
    fn test_apply_dashboard_stats() {
        let stats = DashboardStats {
            id: QueueId::from(1),
            current_queue_length: 6,
            estimated_wait_time: serde_json::Number::from(12u64),
            participants_today: 40,
            status: "Busy".to_string(),
        };

        let mut dashboard = Dashboard::new();
        assert_eq!(apply_dashboard_stats(&mut dashboard, &stats), 0);

        dashboard.mount_summary();
        assert_eq!(apply_dashboard_stats(&mut dashboard, &stats), 4);

        let summary = dashboard.summary();
        assert_eq!(summary.current_queue_length.as_ref().unwrap().text(), "6");
        assert_eq!(summary.estimated_wait_time.as_ref().unwrap().text(), "12 min");
        assert_eq!(summary.participants_today.as_ref().unwrap().text(), "40");
        assert_eq!(summary.status.as_ref().unwrap().text(), "Busy");
    }
}
