//! Review queue selection.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::StoreError;
use crate::models::ProgressRecord;
use crate::store::ProgressAdapter;

/// Builds the list of items due for review.
#[derive(Clone)]
pub struct ReviewQueue {
    progress: ProgressAdapter,
}

impl ReviewQueue {
    pub fn new(progress: ProgressAdapter) -> Self {
        Self { progress }
    }

    /// Items of `user_id` whose next review is unset or at/before `now`,
    /// most overdue first. An empty list means nothing is due.
    pub fn due_items(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressRecord>, StoreError> {
        let due = select_due(self.progress.list(user_id)?, now, None);
        debug!(user_id, due = due.len(), "review queue built");
        Ok(due)
    }

    /// Like [`due_items`](Self::due_items), restricted to one mastery
    /// bucket (1..=5, see [`ProgressRecord::mastery_bucket`]).
    pub fn due_items_in_bucket(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        bucket: u8,
    ) -> Result<Vec<ProgressRecord>, StoreError> {
        if !(1..=5).contains(&bucket) {
            return Err(StoreError::validation(
                "bucket",
                format!("{bucket} is outside 1..=5"),
            ));
        }
        Ok(select_due(self.progress.list(user_id)?, now, Some(bucket)))
    }
}

/// Filter and order `records` for review.
///
/// Never-scheduled items sort before any timestamp; ties break on item id so
/// the order is stable across calls.
pub fn select_due(
    records: Vec<ProgressRecord>,
    now: DateTime<Utc>,
    bucket: Option<u8>,
) -> Vec<ProgressRecord> {
    let mut due: Vec<ProgressRecord> = records
        .into_iter()
        .filter(|r| r.is_due(now))
        .filter(|r| bucket.map_or(true, |b| r.mastery_bucket() == b))
        .collect();
    // Option orders None before Some, which is exactly "unset is most urgent".
    due.sort_by(|a, b| {
        a.next_review_at
            .cmp(&b.next_review_at)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ProgressStore};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn record(item: &str, next: Option<DateTime<Utc>>, mastery: f64) -> ProgressRecord {
        let mut r = ProgressRecord::new("u1", item);
        r.next_review_at = next;
        r.mastery_level = mastery;
        r
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn only_elapsed_items_are_due() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_progress(&record("yesterday", Some(now() - Duration::days(1)), 0.2))
            .unwrap();
        store
            .put_progress(&record("tomorrow", Some(now() + Duration::days(1)), 0.2))
            .unwrap();
        let queue = ReviewQueue::new(ProgressAdapter::new(store));

        let due = queue.due_items("u1", now()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].item_id, "yesterday");
    }

    #[test]
    fn unscheduled_first_then_oldest() {
        let records = vec![
            record("b", Some(now() - Duration::hours(1)), 0.0),
            record("exact", Some(now()), 0.0),
            record("a", Some(now() - Duration::days(3)), 0.0),
            record("never", None, 0.0),
        ];
        let order: Vec<String> = select_due(records, now(), None)
            .into_iter()
            .map(|r| r.item_id)
            .collect();
        assert_eq!(order, vec!["never", "a", "b", "exact"]);
    }

    #[test]
    fn empty_when_nothing_due() {
        let queue = ReviewQueue::new(ProgressAdapter::new(Arc::new(MemoryStore::new())));
        assert!(queue.due_items("u1", now()).unwrap().is_empty());
    }

    #[test]
    fn bucket_filter() {
        let store = Arc::new(MemoryStore::new());
        store.put_progress(&record("weak", None, 0.1)).unwrap();
        store.put_progress(&record("solid", None, 0.85)).unwrap();
        store.put_progress(&record("done", None, 1.0)).unwrap();
        let queue = ReviewQueue::new(ProgressAdapter::new(store));

        let top: Vec<String> = queue
            .due_items_in_bucket("u1", now(), 5)
            .unwrap()
            .into_iter()
            .map(|r| r.item_id)
            .collect();
        assert_eq!(top, vec!["done", "solid"]);
        assert_eq!(queue.due_items_in_bucket("u1", now(), 1).unwrap().len(), 1);
        assert!(queue.due_items_in_bucket("u1", now(), 6).is_err());
    }

    proptest! {
        #[test]
        fn selection_is_idempotent(
            offsets in proptest::collection::vec(proptest::option::of(-500i64..500), 0..40)
        ) {
            let store = Arc::new(MemoryStore::new());
            for (i, offset) in offsets.iter().enumerate() {
                let next = offset.map(|h| now() + Duration::hours(h));
                store.put_progress(&record(&format!("item-{i}"), next, 0.5)).unwrap();
            }
            let queue = ReviewQueue::new(ProgressAdapter::new(store));
            let first = queue.due_items("u1", now()).unwrap();
            let second = queue.due_items("u1", now()).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(first.iter().all(|r| r.is_due(now())));
        }
    }
}
