//! Creation and update times of stored threads and messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A UTC instant, serialized as an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> Timestamp {
        serde_json::from_value(serde_json::Value::String(text.into())).unwrap()
    }

    #[test]
    fn orders_chronologically() {
        let earlier = at("2030-01-15T10:30:00Z");
        let later = at("2030-01-15T10:30:01Z");
        assert!(earlier < later);
    }

    #[test]
    fn serializes_as_rfc3339_string() {
        let ts = at("2030-01-15T10:30:00+02:00");
        assert_eq!(
            serde_json::to_value(ts).unwrap(),
            serde_json::json!("2030-01-15T08:30:00Z")
        );
    }
}
