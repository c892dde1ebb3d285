//! Notifier that only logs notices.

use crate::ports::{Notice, UserNotifier};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl UserNotifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::StillProcessing => tracing::info!("Agent busy, retrying"),
            Notice::DeleteFailed { thread_id } => {
                tracing::warn!(thread_id = %thread_id, "Thread delete failed and was rolled back")
            }
            Notice::PersistenceWarning => tracing::warn!("Conversation update was not saved"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ThreadId;
    use std::sync::Arc;

    #[test]
    fn notify_accepts_every_notice() {
        let notifier: Arc<dyn UserNotifier> = Arc::new(TracingNotifier);
        notifier.notify(Notice::StillProcessing);
        notifier.notify(Notice::DeleteFailed {
            thread_id: ThreadId::new("t-1").unwrap(),
        });
        notifier.notify(Notice::PersistenceWarning);
    }
}
