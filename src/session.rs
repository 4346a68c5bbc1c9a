//! Dashboard Session
//!
//! The single execution context that owns all view state. Frames from the
//! stream transport and user interactions arrive over channels and are
//! handled one at a time, each to completion before the next.

use chrono::{DateTime, Utc};
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::{DashboardStats, QueueStats};
use crate::dashboard::{self, Dashboard, Reconciled};
use crate::notifications::NotificationManager;
use crate::stream::Frame;

/// User interactions forwarded to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// Dismiss the showing notification
    Acknowledge,
    Quit,
}

/// Why [`DashboardSession::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    Quit,
    /// Both the frame and the UI channel closed
    InputsClosed,
}

/// Outcome of handling one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Snapshots written to a widget, fully or partially
    pub applied: usize,
    /// Snapshots with no widget
    pub skipped: usize,
    pub delivered: usize,
}

/// How long [`DashboardSession::run`] waits for issued acknowledgments
/// before returning
pub const DEFAULT_ACK_GRACE: Duration = Duration::from_secs(5);

pub struct DashboardSession {
    dashboard: Dashboard,
    notifications: NotificationManager,
    /// Acknowledgment requests that may still be running
    in_flight: Vec<JoinHandle<()>>,
    ack_grace: Duration,
    auto_mount: bool,
    frames_processed: u64,
    last_frame_at: Option<DateTime<Utc>>,
}

impl DashboardSession {
    pub fn new(dashboard: Dashboard, notifications: NotificationManager) -> Self {
        Self {
            dashboard,
            notifications,
            in_flight: Vec::new(),
            ack_grace: DEFAULT_ACK_GRACE,
            auto_mount: false,
            frames_processed: 0,
            last_frame_at: None,
        }
    }

    /// Mount a full widget for every queue a frame mentions that has none
    pub fn auto_mount(mut self, enabled: bool) -> Self {
        self.auto_mount = enabled;
        self
    }

    /// Upper bound on the wait for in-flight acknowledgments at exit
    pub fn ack_grace(mut self, grace: Duration) -> Self {
        self.ack_grace = grace;
        self
    }

    /// Apply a frame: every snapshot in order, then every notification in order
    pub fn handle_frame(&mut self, frame: Frame) -> FrameReport {
        let mut report = FrameReport::default();

        for snapshot in &frame.queues {
            if self.auto_mount && !self.dashboard.contains(&snapshot.id) {
                tracing::info!(queue_id = %snapshot.id, "Mounting widget for new queue");
                self.dashboard.mount(snapshot.id.clone());
            }

            match dashboard::apply_snapshot(&mut self.dashboard, snapshot) {
                Reconciled::UnknownQueue => report.skipped += 1,
                Reconciled::Applied | Reconciled::Partial { .. } => report.applied += 1,
            }
        }

        for notification in frame.notifications {
            self.notifications.deliver(notification);
            report.delivered += 1;
        }

        self.frames_processed += 1;
        self.last_frame_at = Some(Utc::now());

        tracing::debug!(
            applied = report.applied,
            skipped = report.skipped,
            delivered = report.delivered,
            "Frame processed"
        );
        report
    }

    pub fn handle_ui(&mut self, event: UiEvent) -> ControlFlow<()> {
        match event {
            UiEvent::Acknowledge => {
                self.in_flight.retain(|request| !request.is_finished());
                if let Some(request) = self.notifications.acknowledge() {
                    self.in_flight.push(request);
                }
                ControlFlow::Continue(())
            }
            UiEvent::Quit => ControlFlow::Break(()),
        }
    }

    /// Apply the polled queue list; returns how many entries found a widget
    pub fn apply_queue_stats(&mut self, stats: &[QueueStats]) -> usize {
        let mut applied = 0;
        for entry in stats {
            if self.auto_mount && !self.dashboard.contains(&entry.id) {
                self.dashboard.mount(entry.id.clone());
            }
            if dashboard::apply_queue_stats(&mut self.dashboard, entry).is_applied() {
                applied += 1;
            }
        }
        applied
    }

    pub fn apply_dashboard_stats(&mut self, stats: &DashboardStats) -> usize {
        dashboard::apply_dashboard_stats(&mut self.dashboard, stats)
    }

    /// Process frames and UI events until `Quit` or until both inputs close.
    ///
    /// `on_update` runs after every handled input. A closed frame channel
    /// leaves the last state in place and UI events are still served.
    /// Before returning, waits up to the acknowledgment grace period for
    /// issued acknowledgments so they are not cut off by shutdown.
    pub async fn run<F>(
        &mut self,
        frames: mpsc::Receiver<Frame>,
        ui: mpsc::Receiver<UiEvent>,
        on_update: F,
    ) -> SessionExit
    where
        F: FnMut(&DashboardSession),
    {
        let exit = self.serve(frames, ui, on_update).await;
        self.finish_acknowledgments(self.ack_grace).await;
        exit
    }

    async fn serve<F>(
        &mut self,
        frames: mpsc::Receiver<Frame>,
        ui: mpsc::Receiver<UiEvent>,
        mut on_update: F,
    ) -> SessionExit
    where
        F: FnMut(&DashboardSession),
    {
        let mut frames = Some(frames);
        let mut ui = Some(ui);

        loop {
            if frames.is_none() && ui.is_none() {
                return SessionExit::InputsClosed;
            }

            tokio::select! {
                frame = recv_opt(&mut frames) => match frame {
                    Some(frame) => {
                        self.handle_frame(frame);
                    }
                    None => {
                        tracing::info!("Frame stream closed, dashboard keeps its last state");
                        frames = None;
                        continue;
                    }
                },
                event = recv_opt(&mut ui) => match event {
                    Some(event) => {
                        if self.handle_ui(event).is_break() {
                            tracing::info!("Session quit");
                            return SessionExit::Quit;
                        }
                    }
                    None => {
                        ui = None;
                        continue;
                    }
                },
            }

            on_update(self);
        }
    }

    /// Wait for issued acknowledgments, at most `limit` in total.
    ///
    /// Returns how many were still running when the limit passed.
    pub async fn finish_acknowledgments(&mut self, limit: Duration) -> usize {
        let pending = std::mem::take(&mut self.in_flight);
        if pending.is_empty() {
            return 0;
        }

        tracing::debug!(count = pending.len(), "Waiting for acknowledgments");
        let deadline = tokio::time::Instant::now() + limit;
        let mut unfinished = 0;
        for request in pending {
            if tokio::time::timeout_at(deadline, request).await.is_err() {
                unfinished += 1;
            }
        }

        if unfinished > 0 {
            tracing::warn!(count = unfinished, "Acknowledgments still running at exit");
        }
        unfinished
    }

    /// Acknowledgment requests issued and not yet known to be finished
    pub fn pending_acknowledgments(&self) -> usize {
        self.in_flight.iter().filter(|r| !r.is_finished()).count()
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard {
        &mut self.dashboard
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn last_frame_at(&self) -> Option<DateTime<Utc>> {
        self.last_frame_at
    }
}

/// Receive from an optional channel; a closed-and-cleared channel never yields
async fn recv_opt<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
