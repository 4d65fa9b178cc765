//! Persistence boundary of the engine.
//!
//! The engine never talks to a database directly. It goes through three
//! narrow traits, each keyed the way the data is owned:
//!
//! - [`ProgressStore`]: one [`ProgressRecord`] per (user, item)
//! - [`SessionStore`]: append-only [`SessionSummary`] log per user
//! - [`ReviewListStore`]: the manual review list, one entry per (user, item)
//!
//! [`ProgressAdapter`] wraps a progress backend with input validation so a
//! malformed record is rejected before anything is written.
//!
//! Backends normalize their own failures into [`StoreError`]. Writers are
//! assumed to be one per user; two devices studying the same item at the
//! same time resolve as last-write-wins on the progress record.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::ease::MIN_EASE_FACTOR;
use crate::error::StoreError;
use crate::models::{ProgressRecord, ReviewListEntry, SessionPatch, SessionSummary};

/// Default sanity ceiling for progress counters.
pub const DEFAULT_COUNTER_CEILING: u32 = 10_000;
/// Longest identifier accepted for users and items.
pub const MAX_ID_LEN: usize = 128;

/// Backend holding one progress record per (user, item).
pub trait ProgressStore: Send + Sync {
    fn get_progress(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<ProgressRecord>, StoreError>;

    /// Insert the record, or replace the one stored under the same key.
    fn put_progress(&self, record: &ProgressRecord) -> Result<(), StoreError>;

    /// All records of a user, in no particular order.
    fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>, StoreError>;
}

/// Backend holding session summaries.
pub trait SessionStore: Send + Sync {
    /// Persist a new summary and return its id.
    fn create_session(&self, summary: &SessionSummary) -> Result<String, StoreError>;

    fn get_session(&self, session_id: &str) -> Result<Option<SessionSummary>, StoreError>;

    /// Apply a partial update. Fails with `Validation` once the session has
    /// an end time, and with `NotFound` for an unknown id.
    fn update_session(&self, session_id: &str, patch: &SessionPatch) -> Result<(), StoreError>;

    /// Sessions of a user ordered by start time, optionally only those
    /// starting at or after `since`.
    fn list_sessions(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SessionSummary>, StoreError>;
}

/// Backend holding the manual review list.
pub trait ReviewListStore: Send + Sync {
    fn get_review_entry(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<ReviewListEntry>, StoreError>;

    fn upsert_review_entry(&self, entry: &ReviewListEntry) -> Result<(), StoreError>;

    /// Returns whether an entry was removed.
    fn remove_review_entry(&self, user_id: &str, item_id: &str) -> Result<bool, StoreError>;

    /// Entries of a user ordered by `added_at`.
    fn list_review_entries(&self, user_id: &str) -> Result<Vec<ReviewListEntry>, StoreError>;
}

/// Validating front for a [`ProgressStore`].
#[derive(Clone)]
pub struct ProgressAdapter {
    store: Arc<dyn ProgressStore>,
    counter_ceiling: u32,
}

impl ProgressAdapter {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self::with_counter_ceiling(store, DEFAULT_COUNTER_CEILING)
    }

    pub fn with_counter_ceiling(store: Arc<dyn ProgressStore>, counter_ceiling: u32) -> Self {
        Self {
            store,
            counter_ceiling,
        }
    }

    /// Largest value [`upsert`](Self::upsert) accepts for any counter.
    pub fn counter_ceiling(&self) -> u32 {
        self.counter_ceiling
    }

    /// Stored record, or `None` for an item the user never studied.
    pub fn get(&self, user_id: &str, item_id: &str) -> Result<Option<ProgressRecord>, StoreError> {
        validate_id("user_id", user_id)?;
        validate_id("item_id", item_id)?;
        self.store.get_progress(user_id, item_id)
    }

    /// Stored record, or `NotFound`.
    pub fn get_required(&self, user_id: &str, item_id: &str) -> Result<ProgressRecord, StoreError> {
        self.get(user_id, item_id)?
            .ok_or_else(|| StoreError::not_found("progress record", format!("{user_id}/{item_id}")))
    }

    /// Stored record, or the zero state for a first-time study.
    pub fn get_or_default(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<ProgressRecord, StoreError> {
        Ok(self
            .get(user_id, item_id)?
            .unwrap_or_else(|| ProgressRecord::new(user_id, item_id)))
    }

    /// Validate and persist `record`, replacing any record under its key.
    pub fn upsert(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        validate_record(record, self.counter_ceiling)?;
        self.store.put_progress(record)?;
        debug!(
            user_id = %record.user_id,
            item_id = %record.item_id,
            mastery = record.mastery_level,
            interval_days = record.review_interval_days,
            "progress saved"
        );
        Ok(())
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<ProgressRecord>, StoreError> {
        validate_id("user_id", user_id)?;
        self.store.list_progress(user_id)
    }

    /// Toggle the favorite flag without touching scheduling fields.
    pub fn set_favorite(
        &self,
        user_id: &str,
        item_id: &str,
        is_favorite: bool,
    ) -> Result<ProgressRecord, StoreError> {
        let mut record = self.get_or_default(user_id, item_id)?;
        record.is_favorite = is_favorite;
        self.upsert(&record)?;
        Ok(record)
    }
}

/// Reject empty, overlong, or whitespace/control-bearing identifiers.
pub fn validate_id(field: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::validation(field, "must not be empty"));
    }
    if value.len() > MAX_ID_LEN {
        return Err(StoreError::validation(
            field,
            format!("must be at most {MAX_ID_LEN} bytes"),
        ));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(StoreError::validation(
            field,
            "must not contain whitespace or control characters",
        ));
    }
    Ok(())
}

/// Check a progress record before it is written.
pub fn validate_record(record: &ProgressRecord, counter_ceiling: u32) -> Result<(), StoreError> {
    validate_id("user_id", &record.user_id)?;
    validate_id("item_id", &record.item_id)?;

    if !(0.0..=1.0).contains(&record.mastery_level) {
        return Err(StoreError::validation(
            "mastery_level",
            format!("{} is outside [0, 1]", record.mastery_level),
        ));
    }
    if !record.ease_factor.is_finite() || record.ease_factor < MIN_EASE_FACTOR {
        return Err(StoreError::validation(
            "ease_factor",
            format!("{} is below {MIN_EASE_FACTOR}", record.ease_factor),
        ));
    }
    if record.review_interval_days == 0 {
        return Err(StoreError::validation(
            "review_interval_days",
            "must be at least 1",
        ));
    }

    for (field, value) in [
        ("study_count", record.study_count),
        ("correct_count", record.correct_count),
        ("incorrect_count", record.incorrect_count),
    ] {
        if value > counter_ceiling {
            return Err(StoreError::validation(
                field,
                format!("{value} exceeds the ceiling of {counter_ceiling}"),
            ));
        }
    }
    Ok(())
}

/// Shared rule for [`SessionStore::update_session`] implementations.
pub(crate) fn check_session_patch(existing: &SessionSummary) -> Result<(), StoreError> {
    if existing.is_finished() {
        return Err(StoreError::validation(
            "session",
            format!("session '{}' is already finished", existing.id),
        ));
    }
    Ok(())
}

pub(crate) fn validate_review_entry(entry: &ReviewListEntry) -> Result<(), StoreError> {
    validate_id("user_id", &entry.user_id)?;
    validate_id("item_id", &entry.item_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> ProgressAdapter {
        ProgressAdapter::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let adapter = adapter();
        let mut record = ProgressRecord::new("user-1", "word:apple");
        record.mastery_level = 0.4;
        record.study_count = 3;
        record.correct_count = 2;
        record.incorrect_count = 1;
        record.is_favorite = true;
        adapter.upsert(&record).unwrap();

        assert_eq!(adapter.get("user-1", "word:apple").unwrap(), Some(record));
    }

    #[test]
    fn upsert_updates_instead_of_duplicating() {
        let adapter = adapter();
        let mut record = ProgressRecord::new("u", "i");
        adapter.upsert(&record).unwrap();
        record.study_count = 7;
        adapter.upsert(&record).unwrap();

        let all = adapter.list("u").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].study_count, 7);
    }

    #[test]
    fn missing_record_is_none_or_not_found() {
        let adapter = adapter();
        assert_eq!(adapter.get("u", "nope").unwrap(), None);
        assert!(matches!(
            adapter.get_required("u", "nope"),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(
            adapter.get_or_default("u", "nope").unwrap(),
            ProgressRecord::new("u", "nope")
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        let adapter = adapter();
        let long = "x".repeat(MAX_ID_LEN + 1);
        for bad in ["", "has space", "tab\there", long.as_str()] {
            let record = ProgressRecord::new(bad, "item");
            assert!(adapter.upsert(&record).unwrap_err().is_validation(), "{bad:?}");
        }
        assert!(adapter.get("user", "").unwrap_err().is_validation());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let adapter = adapter();

        let mut record = ProgressRecord::new("u", "i");
        record.mastery_level = 1.01;
        assert!(adapter.upsert(&record).unwrap_err().is_validation());

        let mut record = ProgressRecord::new("u", "i");
        record.mastery_level = f64::NAN;
        assert!(adapter.upsert(&record).unwrap_err().is_validation());

        let mut record = ProgressRecord::new("u", "i");
        record.study_count = DEFAULT_COUNTER_CEILING + 1;
        assert!(adapter.upsert(&record).unwrap_err().is_validation());

        let mut record = ProgressRecord::new("u", "i");
        record.ease_factor = 1.0;
        assert!(adapter.upsert(&record).unwrap_err().is_validation());

        let mut record = ProgressRecord::new("u", "i");
        record.review_interval_days = 0;
        assert!(adapter.upsert(&record).unwrap_err().is_validation());

        // Nothing reached the backend.
        assert!(adapter.list("u").unwrap().is_empty());
    }

    #[test]
    fn custom_ceiling_applies() {
        let adapter = ProgressAdapter::with_counter_ceiling(Arc::new(MemoryStore::new()), 5);
        let mut record = ProgressRecord::new("u", "i");
        record.correct_count = 6;
        assert!(adapter.upsert(&record).is_err());
    }

    #[test]
    fn set_favorite_keeps_schedule() {
        let adapter = adapter();
        let mut record = ProgressRecord::new("u", "i");
        record.review_interval_days = 9;
        record.ease_factor = 2.1;
        adapter.upsert(&record).unwrap();

        let updated = adapter.set_favorite("u", "i", true).unwrap();
        assert!(updated.is_favorite);
        assert_eq!(updated.review_interval_days, 9);
        assert_eq!(updated.ease_factor, 2.1);
    }
}
