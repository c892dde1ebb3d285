//! User Notifier Port - Non-blocking notices shown next to the transcript.
//!
//! Notices are advisory. Sending one must never block or fail the operation
//! that raised it.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::Locale;
use crate::domain::foundation::ThreadId;

/// A user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// The agent is busy and the call is being retried.
    StillProcessing,
    /// Deleting a thread failed and it was restored.
    DeleteFailed { thread_id: ThreadId },
    /// A message or snapshot could not be saved.
    PersistenceWarning,
}

impl Notice {
    pub fn text(&self, locale: Locale) -> &'static str {
        match self {
            Notice::StillProcessing => locale.retrying(),
            Notice::DeleteFailed { .. } => locale.delete_failed(),
            Notice::PersistenceWarning => locale.persistence_warning(),
        }
    }
}

/// Port for delivering notices.
pub trait UserNotifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_text_is_localized() {
        assert_ne!(
            Notice::StillProcessing.text(Locale::En),
            Notice::StillProcessing.text(Locale::Zh)
        );
    }

    #[test]
    fn notice_serializes_with_kind_tag() {
        let json = serde_json::to_value(Notice::PersistenceWarning).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "persistence_warning"}));
    }
}
