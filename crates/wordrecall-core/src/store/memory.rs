//! In-process store backend.
//!
//! Holds all three tables behind one mutex. Owned by whoever constructs it
//! and shared through `Arc`; there is no process-wide instance.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{
    check_session_patch, validate_review_entry, ProgressStore, ReviewListStore, SessionStore,
};
use crate::error::StoreError;
use crate::models::{ProgressRecord, ReviewListEntry, SessionPatch, SessionSummary};

type Key = (String, String);

#[derive(Default)]
struct Tables {
    progress: HashMap<Key, ProgressRecord>,
    sessions: Vec<SessionSummary>,
    review_list: HashMap<Key, ReviewListEntry>,
}

/// Memory-backed implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("memory store lock poisoned: {e}")))
    }
}

fn key(user_id: &str, item_id: &str) -> Key {
    (user_id.to_string(), item_id.to_string())
}

impl ProgressStore for MemoryStore {
    fn get_progress(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        Ok(self.lock()?.progress.get(&key(user_id, item_id)).cloned())
    }

    fn put_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.lock()?
            .progress
            .insert(key(&record.user_id, &record.item_id), record.clone());
        Ok(())
    }

    fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>, StoreError> {
        Ok(self
            .lock()?
            .progress
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

impl SessionStore for MemoryStore {
    fn create_session(&self, summary: &SessionSummary) -> Result<String, StoreError> {
        let mut tables = self.lock()?;
        if tables.sessions.iter().any(|s| s.id == summary.id) {
            return Err(StoreError::validation(
                "session_id",
                format!("session '{}' already exists", summary.id),
            ));
        }
        tables.sessions.push(summary.clone());
        Ok(summary.id.clone())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<SessionSummary>, StoreError> {
        Ok(self
            .lock()?
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned())
    }

    fn update_session(&self, session_id: &str, patch: &SessionPatch) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let session = tables
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| StoreError::not_found("session", session_id))?;
        check_session_patch(session)?;
        session.apply(patch);
        Ok(())
    }

    fn list_sessions(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let mut sessions: Vec<SessionSummary> = self
            .lock()?
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| since.map_or(true, |since| s.start_time >= since))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.start_time);
        Ok(sessions)
    }
}

impl ReviewListStore for MemoryStore {
    fn get_review_entry(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<ReviewListEntry>, StoreError> {
        Ok(self.lock()?.review_list.get(&key(user_id, item_id)).cloned())
    }

    fn upsert_review_entry(&self, entry: &ReviewListEntry) -> Result<(), StoreError> {
        validate_review_entry(entry)?;
        self.lock()?
            .review_list
            .insert(key(&entry.user_id, &entry.item_id), entry.clone());
        Ok(())
    }

    fn remove_review_entry(&self, user_id: &str, item_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()?
            .review_list
            .remove(&key(user_id, item_id))
            .is_some())
    }

    fn list_review_entries(&self, user_id: &str) -> Result<Vec<ReviewListEntry>, StoreError> {
        let mut entries: Vec<ReviewListEntry> = self
            .lock()?
            .review_list
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.item_id.cmp(&b.item_id)));
        Ok(entries)
    }
}
