//! Dashboard View-Model
//!
//! Explicit stand-in for the page the queue server renders: a registry of
//! queue widgets keyed by queue id, each made of addressable elements
//! (`status-{id}`, `length-{id}`, `position-{id}`, `estimated-{id}`), plus
//! the queue owner's single-queue summary panel.
//!
//! The [`reconciler`] projects stream snapshots and polled statistics onto
//! these elements. Updates for queues without a widget are skipped.

mod board;
pub mod reconciler;
mod widget;

pub use board::Dashboard;
pub use reconciler::{
    apply_dashboard_stats, apply_queue_stats, apply_snapshot, project_status, Reconciled,
};
pub use widget::{DashboardSummary, Element, QueueWidget, Slot};
