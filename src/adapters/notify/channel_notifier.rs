//! Notifier backed by an unbounded tokio channel.
//!
//! Sending never blocks. A front end takes the receiver once and renders
//! notices as they arrive; tests drain it synchronously.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::ports::{Notice, UserNotifier};

#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: UnboundedSender<Notice>,
    rx: Arc<Mutex<Option<UnboundedReceiver<Notice>>>>,
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelNotifier {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Hands the receiving end to a consumer. Returns `None` if already taken.
    pub fn take_receiver(&self) -> Option<UnboundedReceiver<Notice>> {
        self.rx.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Returns every pending notice without waiting.
    pub fn drain(&self) -> Vec<Notice> {
        let mut guard = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        let mut notices = Vec::new();
        if let Some(rx) = guard.as_mut() {
            while let Ok(notice) = rx.try_recv() {
                notices.push(notice);
            }
        }
        notices
    }
}

impl UserNotifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            tracing::debug!("Notice dropped: receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ThreadId;

    #[test]
    fn drain_returns_notices_in_order() {
        let notifier = ChannelNotifier::new();
        notifier.notify(Notice::StillProcessing);
        notifier.notify(Notice::DeleteFailed {
            thread_id: ThreadId::new("t1").unwrap(),
        });

        let notices = notifier.drain();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0], Notice::StillProcessing);
        assert!(notifier.drain().is_empty());
    }

    #[tokio::test]
    async fn receiver_can_be_taken_once() {
        let notifier = ChannelNotifier::new();
        let mut rx = notifier.take_receiver().unwrap();
        assert!(notifier.take_receiver().is_none());

        notifier.notify(Notice::PersistenceWarning);
        assert_eq!(rx.recv().await, Some(Notice::PersistenceWarning));
    }
}
