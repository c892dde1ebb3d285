//! Thread - a persisted conversation for one user and one hotel search.
//!
//! # Ownership
//!
//! A thread belongs to exactly one user. Its messages are owned by the thread
//! and deleted with it; they are never addressed on their own.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::comparison::{ComparisonContext, COMPARISON_DATA_KEY};
use crate::domain::foundation::{ThreadId, Timestamp, UserId};
use crate::domain::search::SearchContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: ThreadId,
    pub user_id: UserId,
    pub hotel_name: String,
    #[serde(default)]
    pub hotel_id: Option<String>,
    #[serde(default)]
    pub check_in: Option<NaiveDate>,
    #[serde(default)]
    pub check_out: Option<NaiveDate>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Thread {
    /// Applies a patch locally, mirroring what the persistence service does:
    /// metadata is merged key by key, other fields overwrite when present.
    pub fn apply_patch(&mut self, patch: &ThreadPatch, now: Timestamp) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(hotel_name) = &patch.hotel_name {
            self.hotel_name = hotel_name.clone();
        }
        if let Some(hotel_id) = &patch.hotel_id {
            self.hotel_id = Some(hotel_id.clone());
        }
        if let Some(check_in) = patch.check_in {
            self.check_in = Some(check_in);
        }
        if let Some(check_out) = patch.check_out {
            self.check_out = Some(check_out);
        }
        if let Some(metadata) = &patch.metadata {
            for (key, value) in metadata {
                self.metadata.insert(key.clone(), value.clone());
            }
        }
        self.updated_at = now;
    }

    pub fn has_comparison(&self) -> bool {
        self.metadata.contains_key(COMPARISON_DATA_KEY)
    }

    /// Recomputes the comparison context from the stored snapshot.
    pub fn comparison_context(&self) -> Option<ComparisonContext> {
        ComparisonContext::from_metadata(&self.metadata)
    }
}

/// Fields for creating a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThread {
    pub hotel_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,
    pub title: String,
    pub metadata: Map<String, Value>,
}

impl NewThread {
    pub fn from_search(search: &SearchContext) -> Self {
        Self {
            hotel_name: search.hotel_name().to_string(),
            hotel_id: None,
            check_in: search.check_in(),
            check_out: search.check_out(),
            title: thread_title(search.hotel_name(), search.check_in(), search.check_out()),
            metadata: Map::new(),
        }
    }
}

/// Partial update for a thread. `metadata` is merged, not replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ThreadPatch {
    pub fn metadata(metadata: Map<String, Value>) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::default()
        }
    }
}

/// "Hotel · 2030-05-01 → 2030-05-04", or just the hotel name without dates.
pub fn thread_title(
    hotel_name: &str,
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
) -> String {
    match (check_in, check_out) {
        (Some(check_in), Some(check_out)) => format!(
            "{} · {} → {}",
            hotel_name.trim(),
            check_in.format("%Y-%m-%d"),
            check_out.format("%Y-%m-%d")
        ),
        _ => hotel_name.trim().to_string(),
    }
}
