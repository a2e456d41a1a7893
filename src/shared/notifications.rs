//! User-facing notifications emitted by the engine.
//!
//! Delivery is fire-and-forget: the engine never waits for, or depends on,
//! a sink accepting a notification.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl Notification {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            data,
        }
    }

    pub fn info(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
            data,
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to whoever holds the receiving half
pub struct ChannelNotificationSink {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotificationSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            log::debug!("Notification dropped: receiver closed");
        }
    }
}

/// Writes notifications through the logger; used when no UI is attached
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => log::info!("[success] {}", notification.message),
            NotificationKind::Info => log::info!("[info] {}", notification.message),
            NotificationKind::Error => log::warn!("[error] {}", notification.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelNotificationSink::new();
        sink.notify(Notification::success("youtube: uploaded", None));
        sink.notify(Notification::error("reddit: missing subreddit", None));

        assert_eq!(rx.recv().await.unwrap().kind, NotificationKind::Success);
        assert_eq!(rx.recv().await.unwrap().kind, NotificationKind::Error);
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (sink, rx) = ChannelNotificationSink::new();
        drop(rx);
        sink.notify(Notification::info("nobody listening", None));
    }

    #[test]
    fn test_notification_wire_shape() {
        let json = serde_json::to_value(Notification::info("ready", None)).unwrap();
        assert_eq!(json["type"], "info");
        assert_eq!(json["message"], "ready");
    }
}
