use crate::domain::model::{Notice, NoticeKind};
use crate::domain::ports::Notifier;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Error => tracing::error!("❌ {}", message),
            NoticeKind::Warning => tracing::warn!("⚠️ {}", message),
        }
    }
}

/// Forwards notices to a UI task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        let notice = Notice {
            kind,
            message: message.to_string(),
        };
        // 接收端已關閉代表畫面已卸載
        if self.sender.send(notice).is_err() {
            tracing::debug!("Notice dropped, receiver closed: {}", message);
        }
    }
}

/// Keeps every notice in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Notice {
                kind,
                message: message.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_notifier_delivers_in_order() {
        let (notifier, mut receiver) = ChannelNotifier::new();
        notifier.notify(NoticeKind::Warning, "maximum 3");
        notifier.notify(NoticeKind::Error, "too large");

        assert_eq!(receiver.recv().await.unwrap().message, "maximum 3");
        assert_eq!(receiver.recv().await.unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn test_channel_notifier_survives_closed_receiver() {
        let (notifier, receiver) = ChannelNotifier::new();
        drop(receiver);
        notifier.notify(NoticeKind::Error, "nobody listening");
    }

    #[test]
    fn test_memory_notifier_collects() {
        let notifier = MemoryNotifier::default();
        notifier.notify(NoticeKind::Warning, "first");
        assert_eq!(notifier.notices().len(), 1);
    }
}
