//! Notification modal view-model

use crate::stream::Notification;

/// The single modal used to present turn notifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationModal {
    visible: bool,
    message: String,
}

impl NotificationModal {
    pub fn show(&mut self, notification: &Notification) {
        self.message = notification.display_message();
        self.visible = true;
    }

    /// Hide the modal; the last message stays as the modal's content
    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
