//! Messages shown in a conversation thread.

use serde::{Deserialize, Serialize};

use crate::domain::comparison::Evaluation;
use crate::domain::foundation::{MessageId, Timestamp};

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// How the message body should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Comparison,
}

/// A message in a thread. Append-only; ordered by `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: Timestamp,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Evaluation>,
}

impl Message {
    fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Timestamp::now(),
            kind: MessageKind::Text,
            comparison: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, content)
    }

    /// Transient notices (processing placeholders). Never persisted.
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(MessageRole::System, content)
    }

    /// A comparison-kind assistant message. The content is the serialized
    /// evaluation so the persisted transcript can redisplay the table.
    pub fn comparison(evaluation: Evaluation) -> Self {
        let content = serde_json::to_string(&evaluation).unwrap_or_default();
        Self {
            id: MessageId::new(),
            role: MessageRole::Assistant,
            content,
            timestamp: Timestamp::now(),
            kind: MessageKind::Comparison,
            comparison: Some(evaluation),
        }
    }

    /// Rebuilds a message loaded from the persistence service, detecting
    /// serialized comparison payloads.
    pub fn from_stored(
        id: MessageId,
        role: MessageRole,
        content: String,
        timestamp: Timestamp,
    ) -> Self {
        let comparison = (role == MessageRole::Assistant && content.trim_start().starts_with('{'))
            .then(|| Evaluation::parse(&content).ok())
            .flatten()
            .filter(Evaluation::has_rates);

        Self {
            id,
            role,
            kind: if comparison.is_some() {
                MessageKind::Comparison
            } else {
                MessageKind::Text
            },
            content,
            timestamp,
            comparison,
        }
    }

    pub fn is_persistable(&self) -> bool {
        self.role != MessageRole::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation() -> Evaluation {
        Evaluation::parse(r#"{"hotel_name":"Raffles","table_rows":[{"platform":"Direct","price":500}]}"#)
            .unwrap()
    }

    #[test]
    fn comparison_message_carries_payload() {
        let msg = Message::comparison(evaluation());
        assert_eq!(msg.kind, MessageKind::Comparison);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(msg.content.contains("Raffles"));
    }

    #[test]
    fn from_stored_detects_comparison_content() {
        let stored = Message::comparison(evaluation());
        let loaded = Message::from_stored(
            MessageId::from_server("m1"),
            MessageRole::Assistant,
            stored.content.clone(),
            Timestamp::now(),
        );
        assert_eq!(loaded.kind, MessageKind::Comparison);
        assert_eq!(loaded.comparison, stored.comparison);
    }

    #[test]
    fn from_stored_keeps_plain_text() {
        let loaded = Message::from_stored(
            MessageId::from_server("m2"),
            MessageRole::User,
            "{not a table".into(),
            Timestamp::now(),
        );
        assert_eq!(loaded.kind, MessageKind::Text);
        assert!(loaded.comparison.is_none());
    }

    #[test]
    fn system_messages_are_not_persisted() {
        assert!(!Message::system("working").is_persistable());
        assert!(Message::user("hi").is_persistable());
    }
}
