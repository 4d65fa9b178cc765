//! Snapshot of a user's progress across all items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ProgressRecord;

/// Mastery at or above which an item counts as mastered.
pub const MASTERED_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverview {
    pub total_items: u32,
    pub mastered_items: u32,
    pub due_items: u32,
    pub favorite_items: u32,
    pub average_mastery: f64,
    /// Item counts per mastery bucket 1..=5.
    pub by_bucket: [u32; 5],
}

pub fn progress_overview(records: &[ProgressRecord], now: DateTime<Utc>) -> ProgressOverview {
    let mut overview = ProgressOverview::default();
    let mut mastery_sum = 0.0;
    for record in records {
        overview.total_items += 1;
        mastery_sum += record.mastery_level;
        if record.mastery_level >= MASTERED_THRESHOLD {
            overview.mastered_items += 1;
        }
        if record.is_due(now) {
            overview.due_items += 1;
        }
        if record.is_favorite {
            overview.favorite_items += 1;
        }
        overview.by_bucket[usize::from(record.mastery_bucket() - 1)] += 1;
    }
    if overview.total_items > 0 {
        overview.average_mastery =
            (mastery_sum / f64::from(overview.total_items) * 1000.0).round() / 1000.0;
    }
    overview
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn empty_overview() {
        let overview = progress_overview(&[], Utc::now());
        assert_eq!(overview, ProgressOverview::default());
    }

    #[test]
    fn counts_and_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        let mut a = ProgressRecord::new("u", "a");
        a.mastery_level = 0.9;
        a.next_review_at = Some(now + Duration::days(4));
        a.is_favorite = true;
        let mut b = ProgressRecord::new("u", "b");
        b.mastery_level = 0.3;
        b.next_review_at = Some(now - Duration::days(1));
        let c = ProgressRecord::new("u", "c");

        let overview = progress_overview(&[a, b, c], now);
        assert_eq!(overview.total_items, 3);
        assert_eq!(overview.mastered_items, 1);
        assert_eq!(overview.due_items, 2);
        assert_eq!(overview.favorite_items, 1);
        assert_eq!(overview.by_bucket, [1, 1, 0, 0, 1]);
        assert_eq!(overview.average_mastery, 0.4);
    }
}
