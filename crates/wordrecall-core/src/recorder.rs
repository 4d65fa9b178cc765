//! Session recording.
//!
//! Turns the outcomes of a study session into progress updates and one
//! session summary. A failed progress update for one item is logged and
//! skipped; the rest of the session is still recorded.
//!
//! Outcomes are applied one by one in the order given, so if the same item
//! appears twice in a session its final state reflects the last outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calendar::{Clock, FixedOffsetCalendar, LocalCalendar, SystemClock};
use crate::ease::{next_review_at, EaseFactorModel, EaseState, RatingIntervalModel, RecallOutcome};
use crate::error::StoreError;
use crate::models::{
    ItemOutcome, ProgressRecord, ReviewListEntry, SessionPatch, SessionSummary, StudyMode,
};
use crate::store::{validate_id, ProgressAdapter, ReviewListStore, SessionStore};

/// Describes the session a batch of outcomes belongs to.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub mode: StudyMode,
    pub category: String,
    pub started_at: DateTime<Utc>,
}

/// An item whose progress could not be saved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub item_id: String,
    pub error: String,
}

/// Result of [`SessionRecorder::record_session`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSession {
    pub summary: SessionSummary,
    /// Items whose progress update failed; empty on full success.
    pub failures: Vec<ItemFailure>,
}

/// Result of [`SessionRecorder::record_item`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedItem {
    pub session: SessionSummary,
    /// Updated progress, or `None` if saving it failed.
    pub progress: Option<ProgressRecord>,
}

/// Applies study outcomes to progress records and keeps session summaries.
pub struct SessionRecorder {
    progress: ProgressAdapter,
    sessions: Arc<dyn SessionStore>,
    review_list: Arc<dyn ReviewListStore>,
    clock: Arc<dyn Clock>,
    calendar: Arc<dyn LocalCalendar>,
    ease: EaseFactorModel,
    rating: RatingIntervalModel,
}

impl SessionRecorder {
    pub fn new(
        progress: ProgressAdapter,
        sessions: Arc<dyn SessionStore>,
        review_list: Arc<dyn ReviewListStore>,
    ) -> Self {
        Self {
            progress,
            sessions,
            review_list,
            clock: Arc::new(SystemClock),
            calendar: Arc::new(FixedOffsetCalendar::utc()),
            ease: EaseFactorModel::new(),
            rating: RatingIntervalModel::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn LocalCalendar>) -> Self {
        self.calendar = calendar;
        self
    }

    /// Apply one outcome to the user's progress on that item and save it.
    /// A missing record is treated as a first-time study.
    pub fn apply_outcome(
        &self,
        user_id: &str,
        outcome: &ItemOutcome,
        studied_at: DateTime<Utc>,
    ) -> Result<ProgressRecord, StoreError> {
        let mut record = self.progress.get_or_default(user_id, &outcome.item_id)?;
        let next = self.ease.apply_outcome(
            EaseState::from(&record),
            RecallOutcome {
                is_correct: outcome.is_correct,
                difficulty_level: outcome.difficulty_level,
            },
        );

        record.ease_factor = next.ease_factor;
        record.review_interval_days = next.review_interval_days;
        record.mastery_level = next.mastery_level;
        // Counters stop at the ceiling so scheduling keeps working past it.
        let ceiling = self.progress.counter_ceiling();
        let bump = |n: u32| n.saturating_add(1).min(ceiling);
        record.study_count = bump(record.study_count);
        if outcome.is_correct {
            record.correct_count = bump(record.correct_count);
        } else {
            record.incorrect_count = bump(record.incorrect_count);
        }
        record.last_studied = Some(studied_at);
        record.next_review_at = Some(next_review_at(
            self.calendar.as_ref(),
            studied_at,
            next.review_interval_days,
        ));

        self.progress.upsert(&record)?;
        debug!(
            user_id,
            item_id = %record.item_id,
            correct = outcome.is_correct,
            ease = record.ease_factor,
            interval_days = record.review_interval_days,
            "outcome applied"
        );
        Ok(record)
    }

    /// Record a completed session in one call.
    ///
    /// Every outcome updates its item's progress; failures are logged and
    /// reported in [`RecordedSession::failures`] without aborting the rest.
    /// The summary counts all outcomes, saved or not, and is stored already
    /// finalized. Fails only if `user_id` is malformed or the summary itself
    /// cannot be stored.
    pub fn record_session(
        &self,
        user_id: &str,
        context: SessionContext,
        outcomes: &[ItemOutcome],
    ) -> Result<RecordedSession, StoreError> {
        validate_id("user_id", user_id)?;
        let ended_at = self.clock.now();

        let mut failures = Vec::new();
        for outcome in outcomes {
            if let Err(e) = self.apply_outcome(user_id, outcome, ended_at) {
                warn!(
                    user_id,
                    item_id = %outcome.item_id,
                    error = %e,
                    "failed to update item progress; continuing with the rest of the session"
                );
                failures.push(ItemFailure {
                    item_id: outcome.item_id.clone(),
                    error: e.to_string(),
                });
            }
        }

        let completed = count_u32(outcomes.len());
        let summary = SessionSummary {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            mode: context.mode,
            category: context.category,
            total_items: completed,
            completed_items: completed,
            correct_answers: count_u32(outcomes.iter().filter(|o| o.is_correct).count()),
            start_time: context.started_at,
            end_time: Some(ended_at),
        };
        self.sessions.create_session(&summary)?;

        info!(
            user_id,
            session_id = %summary.id,
            completed = summary.completed_items,
            correct = summary.correct_answers,
            failed = failures.len(),
            "session recorded"
        );
        Ok(RecordedSession { summary, failures })
    }

    /// Open a session that will be filled item by item.
    pub fn start_session(
        &self,
        user_id: &str,
        mode: StudyMode,
        category: &str,
        total_items: u32,
    ) -> Result<SessionSummary, StoreError> {
        validate_id("user_id", user_id)?;
        let summary = SessionSummary {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            mode,
            category: category.to_string(),
            total_items,
            completed_items: 0,
            correct_answers: 0,
            start_time: self.clock.now(),
            end_time: None,
        };
        self.sessions.create_session(&summary)?;
        debug!(user_id, session_id = %summary.id, "session started");
        Ok(summary)
    }

    /// Apply one outcome inside an open session and bump its counters.
    ///
    /// As with [`record_session`](Self::record_session), a failed progress
    /// update is logged and the item still counts as completed.
    pub fn record_item(
        &self,
        session_id: &str,
        outcome: &ItemOutcome,
    ) -> Result<RecordedItem, StoreError> {
        let mut session = self.open_session(session_id)?;

        let progress = match self.apply_outcome(&session.user_id, outcome, self.clock.now()) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    user_id = %session.user_id,
                    session_id,
                    item_id = %outcome.item_id,
                    error = %e,
                    "failed to update item progress"
                );
                None
            }
        };

        let patch = SessionPatch {
            completed_items: Some(session.completed_items.saturating_add(1)),
            correct_answers: Some(
                session
                    .correct_answers
                    .saturating_add(u32::from(outcome.is_correct)),
            ),
            // Sessions started with an unknown size grow as items arrive.
            total_items: (session.completed_items >= session.total_items)
                .then(|| session.completed_items.saturating_add(1)),
            end_time: None,
        };
        self.sessions.update_session(session_id, &patch)?;
        session.apply(&patch);
        Ok(RecordedItem { session, progress })
    }

    /// Set the end time of an open session, freezing it.
    pub fn finish_session(&self, session_id: &str) -> Result<SessionSummary, StoreError> {
        let mut session = self.open_session(session_id)?;
        let patch = SessionPatch {
            end_time: Some(self.clock.now()),
            ..Default::default()
        };
        self.sessions.update_session(session_id, &patch)?;
        session.apply(&patch);
        info!(
            user_id = %session.user_id,
            session_id,
            completed = session.completed_items,
            correct = session.correct_answers,
            "session finished"
        );
        Ok(session)
    }

    fn open_session(&self, session_id: &str) -> Result<SessionSummary, StoreError> {
        let session = self
            .sessions
            .get_session(session_id)?
            .ok_or_else(|| StoreError::not_found("session", session_id))?;
        if session.is_finished() {
            return Err(StoreError::validation(
                "session",
                format!("session '{session_id}' is already finished"),
            ));
        }
        Ok(session)
    }

    /// Put an item on the user's manual review list. Adding an item that is
    /// already listed returns the existing entry unchanged.
    pub fn add_to_review(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<ReviewListEntry, StoreError> {
        validate_id("user_id", user_id)?;
        validate_id("item_id", item_id)?;
        if let Some(existing) = self.review_list.get_review_entry(user_id, item_id)? {
            return Ok(existing);
        }
        let entry = ReviewListEntry::new(user_id, item_id, self.clock.now());
        self.review_list.upsert_review_entry(&entry)?;
        Ok(entry)
    }

    /// Take an item off the review list. Returns whether it was listed.
    pub fn remove_from_review(&self, user_id: &str, item_id: &str) -> Result<bool, StoreError> {
        validate_id("user_id", user_id)?;
        validate_id("item_id", item_id)?;
        self.review_list.remove_review_entry(user_id, item_id)
    }

    /// Record a 1-5 difficulty rating for a listed item.
    pub fn rate_review(
        &self,
        user_id: &str,
        item_id: &str,
        rating: u8,
    ) -> Result<ReviewListEntry, StoreError> {
        validate_id("user_id", user_id)?;
        validate_id("item_id", item_id)?;
        if !(1..=5).contains(&rating) {
            return Err(StoreError::validation(
                "rating",
                format!("{rating} is outside 1..=5"),
            ));
        }
        let entry = self
            .review_list
            .get_review_entry(user_id, item_id)?
            .ok_or_else(|| {
                StoreError::not_found("review list entry", format!("{user_id}/{item_id}"))
            })?;
        let updated = self
            .rating
            .apply(&entry, rating, self.clock.now(), self.calendar.as_ref());
        self.review_list.upsert_review_entry(&updated)?;
        Ok(updated)
    }

    /// The user's review list, oldest addition first.
    pub fn list_review(&self, user_id: &str) -> Result<Vec<ReviewListEntry>, StoreError> {
        validate_id("user_id", user_id)?;
        self.review_list.list_review_entries(user_id)
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;
    use crate::store::{MemoryStore, ProgressStore, DEFAULT_COUNTER_CEILING};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 2, 19, 30, 0).unwrap()
    }

    fn recorder(store: Arc<MemoryStore>) -> SessionRecorder {
        SessionRecorder::new(ProgressAdapter::new(store.clone()), store.clone(), store)
            .with_clock(Arc::new(FixedClock(now())))
    }

    fn context() -> SessionContext {
        SessionContext {
            mode: StudyMode::Flashcard,
            category: "travel".into(),
            started_at: now() - Duration::minutes(12),
        }
    }

    /// Progress backend that refuses writes for one item.
    struct FlakyProgress {
        inner: MemoryStore,
        broken_item: &'static str,
    }

    impl ProgressStore for FlakyProgress {
        fn get_progress(
            &self,
            user_id: &str,
            item_id: &str,
        ) -> Result<Option<ProgressRecord>, StoreError> {
            self.inner.get_progress(user_id, item_id)
        }

        fn put_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
            if record.item_id == self.broken_item {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            self.inner.put_progress(record)
        }

        fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>, StoreError> {
            self.inner.list_progress(user_id)
        }
    }

    #[test]
    fn record_session_updates_progress_and_summary() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store.clone());

        let recorded = recorder
            .record_session(
                "u1",
                context(),
                &[
                    ItemOutcome::correct("hello").with_difficulty(3),
                    ItemOutcome::incorrect("goodbye"),
                    ItemOutcome::correct("thanks"),
                ],
            )
            .unwrap();

        assert!(recorded.failures.is_empty());
        let summary = &recorded.summary;
        assert_eq!(summary.completed_items, 3);
        assert_eq!(summary.correct_answers, 2);
        assert_eq!(summary.start_time, now() - Duration::minutes(12));
        assert_eq!(summary.end_time, Some(now()));
        assert_eq!(summary.duration_minutes(), 12);

        let hello = store.get_progress("u1", "hello").unwrap().unwrap();
        assert_eq!(hello.study_count, 1);
        assert_eq!(hello.correct_count, 1);
        assert_eq!(hello.review_interval_days, 3);
        assert_eq!(hello.last_studied, Some(now()));
        assert_eq!(
            hello.next_review_at,
            Some(Utc.with_ymd_and_hms(2024, 10, 5, 0, 0, 0).unwrap())
        );

        let goodbye = store.get_progress("u1", "goodbye").unwrap().unwrap();
        assert_eq!(goodbye.incorrect_count, 1);
        assert_eq!(goodbye.review_interval_days, 1);

        assert_eq!(store.list_sessions("u1", None).unwrap(), vec![summary.clone()]);
    }

    #[test]
    fn counters_at_ceiling_still_reschedule() {
        let store = Arc::new(MemoryStore::new());
        let mut seasoned = ProgressRecord::new("u1", "apple");
        seasoned.study_count = DEFAULT_COUNTER_CEILING;
        seasoned.correct_count = DEFAULT_COUNTER_CEILING;
        seasoned.mastery_level = 0.9;
        seasoned.review_interval_days = 20;
        store.put_progress(&seasoned).unwrap();

        let recorded = recorder(store.clone())
            .record_session("u1", context(), &[ItemOutcome::incorrect("apple")])
            .unwrap();
        assert!(recorded.failures.is_empty());

        let apple = store.get_progress("u1", "apple").unwrap().unwrap();
        assert_eq!(apple.study_count, DEFAULT_COUNTER_CEILING);
        assert_eq!(apple.correct_count, DEFAULT_COUNTER_CEILING);
        assert_eq!(apple.incorrect_count, 1);
        assert_eq!(apple.review_interval_days, 1);
        assert!((apple.ease_factor - 2.3).abs() < 1e-9);
        assert!((apple.mastery_level - 0.7).abs() < 1e-9);
        assert_eq!(apple.last_studied, Some(now()));
    }

    #[test]
    fn one_failing_item_does_not_abort_the_session() {
        let flaky = Arc::new(FlakyProgress {
            inner: MemoryStore::new(),
            broken_item: "broken",
        });
        let sessions = Arc::new(MemoryStore::new());
        let recorder = SessionRecorder::new(
            ProgressAdapter::new(flaky.clone()),
            sessions.clone(),
            sessions.clone(),
        )
        .with_clock(Arc::new(FixedClock(now())));

        let recorded = recorder
            .record_session(
                "u1",
                context(),
                &[
                    ItemOutcome::correct("first"),
                    ItemOutcome::correct("broken"),
                    ItemOutcome::incorrect("bad id"),
                    ItemOutcome::correct("last"),
                ],
            )
            .unwrap();

        let failed: Vec<&str> = recorded.failures.iter().map(|f| f.item_id.as_str()).collect();
        assert_eq!(failed, vec!["broken", "bad id"]);
        assert_eq!(recorded.summary.completed_items, 4);
        assert!(flaky.get_progress("u1", "first").unwrap().is_some());
        assert!(flaky.get_progress("u1", "last").unwrap().is_some());
        assert_eq!(sessions.list_sessions("u1", None).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_outcomes_apply_in_order() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store.clone());
        recorder
            .record_session(
                "u1",
                context(),
                &[ItemOutcome::correct("twice"), ItemOutcome::incorrect("twice")],
            )
            .unwrap();

        let record = store.get_progress("u1", "twice").unwrap().unwrap();
        assert_eq!(record.study_count, 2);
        assert_eq!(record.review_interval_days, 1);
        assert!((record.ease_factor - 2.4).abs() < 1e-9);
        assert!(record.mastery_level.abs() < 1e-9);
    }

    #[test]
    fn invalid_user_is_rejected_before_any_write() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store.clone());
        let err = recorder
            .record_session("", context(), &[ItemOutcome::correct("x")])
            .unwrap_err();
        assert!(err.is_validation());
        assert!(store.list_sessions("", None).unwrap().is_empty());
    }

    #[test]
    fn incremental_session_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store.clone());

        let session = recorder
            .start_session("u1", StudyMode::Quiz, "numbers", 2)
            .unwrap();
        assert!(session.end_time.is_none());

        recorder
            .record_item(&session.id, &ItemOutcome::correct("one"))
            .unwrap();
        let second = recorder
            .record_item(&session.id, &ItemOutcome::incorrect("two"))
            .unwrap();
        assert_eq!(second.session.completed_items, 2);
        assert_eq!(second.session.correct_answers, 1);
        assert!(second.progress.is_some());

        let finished = recorder.finish_session(&session.id).unwrap();
        assert_eq!(finished.end_time, Some(now()));
        assert_eq!(store.get_session(&session.id).unwrap(), Some(finished));

        assert!(recorder
            .record_item(&session.id, &ItemOutcome::correct("three"))
            .unwrap_err()
            .is_validation());
        assert!(recorder.finish_session(&session.id).is_err());
    }

    #[test]
    fn open_sessions_grow_past_their_planned_size() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store);
        let session = recorder
            .start_session("u1", StudyMode::Review, "", 0)
            .unwrap();
        let item = recorder
            .record_item(&session.id, &ItemOutcome::correct("extra"))
            .unwrap();
        assert_eq!(item.session.total_items, 1);
        assert_eq!(item.session.completed_items, 1);
    }

    #[test]
    fn record_item_on_unknown_session() {
        let recorder = recorder(Arc::new(MemoryStore::new()));
        assert!(matches!(
            recorder.record_item("nope", &ItemOutcome::correct("x")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn review_list_operations() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store);

        let added = recorder.add_to_review("u1", "quixotic").unwrap();
        assert_eq!(added.review_count, 0);
        assert_eq!(added.added_at, now());
        assert_eq!(recorder.add_to_review("u1", "quixotic").unwrap(), added);

        let rated = recorder.rate_review("u1", "quixotic", 4).unwrap();
        assert_eq!(rated.review_count, 1);
        assert_eq!(rated.last_reviewed, Some(now()));
        assert_eq!(
            rated.next_review_at,
            Some(Utc.with_ymd_and_hms(2024, 10, 3, 0, 0, 0).unwrap())
        );

        let rated_again = recorder.rate_review("u1", "quixotic", 5).unwrap();
        assert_eq!(rated_again.review_count, 2);
        assert_eq!(
            rated_again.next_review_at,
            Some(Utc.with_ymd_and_hms(2024, 10, 4, 0, 0, 0).unwrap())
        );

        assert!(recorder.rate_review("u1", "quixotic", 0).unwrap_err().is_validation());
        assert!(matches!(
            recorder.rate_review("u1", "unlisted", 3),
            Err(StoreError::NotFound { .. })
        ));

        assert_eq!(recorder.list_review("u1").unwrap().len(), 1);
        assert!(recorder.remove_from_review("u1", "quixotic").unwrap());
        assert!(recorder.list_review("u1").unwrap().is_empty());
    }
}
