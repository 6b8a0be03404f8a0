//! Lifecycle callbacks and user notifications

use parking_lot::Mutex;
use serde::Serialize;

use crate::model::Entity;

/// Host component told about lifecycle events of the entity it displays
///
/// Every callback defaults to doing nothing.
pub trait ContentOwner: Send + Sync {
    /// A blank entity was created and selected
    fn on_entity_created(&self, entity: &dyn Entity) {
        let _ = entity;
    }

    /// The entity was persisted
    fn on_entity_saved(&self, entity: &dyn Entity) {
        let _ = entity;
    }

    /// The entity was deleted
    fn on_entity_deleted(&self, entity: &dyn Entity) {
        let _ = entity;
    }

    /// The entity was reloaded from its data service
    fn on_entity_refreshed(&self, entity: &dyn Entity) {
        let _ = entity;
    }
}

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Hint
    Info,
    /// Operation completed
    Success,
    /// Operation refused or partially applied
    Warning,
    /// Operation failed
    Error,
}

/// Message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Severity
    pub level: NotificationLevel,
    /// Message text
    pub message: String,
}

impl Notification {
    /// Informational hint
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    /// Success message
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    /// Warning message
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    /// Error message
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Delivers notifications to the user
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Show a notification
    fn notify(&self, notification: &Notification);
}

/// Notifier that writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(level = ?notification.level, "{}", notification.message);
            }
            NotificationLevel::Warning => tracing::warn!("{}", notification.message),
            NotificationLevel::Error => tracing::error!("{}", notification.message),
        }
    }
}

/// Notifier that keeps every notification, for tests and previews
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    /// Messages received so far
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .map(|notification| notification.message.clone())
            .collect()
    }

    /// Most recent notification
    #[must_use]
    pub fn last(&self) -> Option<Notification> {
        self.notifications.lock().last().cloned()
    }

    /// Forget everything received
    pub fn clear(&self) {
        self.notifications.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.notifications.lock().push(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(&Notification::info("first"));
        notifier.notify(&Notification::error("second"));

        assert_eq!(notifier.messages(), vec!["first", "second"]);
        assert_eq!(notifier.last().unwrap().level, NotificationLevel::Error);
        notifier.clear();
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_notification_serializes_lowercase_level() {
        let json = serde_json::to_string(&Notification::success("Saved")).unwrap();
        assert_eq!(json, r#"{"level":"success","message":"Saved"}"#);
    }

    #[test]
    fn test_mock_notifier() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n| n.level == NotificationLevel::Warning)
            .times(1)
            .return_const(());
        notifier.notify(&Notification::warning("careful"));
    }
}
