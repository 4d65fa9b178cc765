//! Study streaks over calendar days.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    /// Run of consecutive study days ending today, or yesterday if nothing
    /// was studied yet today.
    pub current_streak: u32,
    /// Longest run of consecutive study days ever.
    pub longest_streak: u32,
}

/// Streaks over the set of days that had at least one session.
pub fn compute_streaks(study_days: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakState {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for &day in study_days {
        run = match previous {
            Some(prev) if day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }

    let mut day = if study_days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut current = 0u32;
    while let Some(d) = day.filter(|d| study_days.contains(d)) {
        current += 1;
        day = d.pred_opt();
    }

    StreakState {
        current_streak: current,
        longest_streak: longest,
    }
}
