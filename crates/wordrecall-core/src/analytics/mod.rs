//! Learning analytics.
//!
//! Aggregates session summaries into zero-filled daily buckets, weekly
//! rollups, summary windows and streaks. Two reads are made per report: the
//! recent window for the buckets, and the full history for lifetime totals
//! and streaks, so lifetime figures are never cut off by the display window.
//!
//! All day boundaries come from the injected [`LocalCalendar`].

mod daily;
mod overview;
mod streak;

pub use daily::{accuracy, daily_buckets, weekly_rollup, DailyAggregate, Totals, WeeklyAggregate};
pub use overview::{progress_overview, ProgressOverview, MASTERED_THRESHOLD};
pub use streak::{compute_streaks, StreakState};

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::{Clock, FixedOffsetCalendar, LocalCalendar, SystemClock};
use crate::error::StoreError;
use crate::models::SessionSummary;
use crate::store::{validate_id, ProgressAdapter, SessionStore};

/// Largest accepted reporting window.
pub const MAX_WINDOW_DAYS: u32 = 3_660;
/// Summary windows are computed over at least this many days of buckets.
const SUMMARY_SPAN_DAYS: u32 = 30;

/// Headline figures of a learning record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSummary {
    pub today: Totals,
    pub last_7_days: Totals,
    pub last_30_days: Totals,
    pub lifetime: Totals,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Dashboard data for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningRecord {
    /// One entry per day of the window, oldest first, today last.
    pub daily: Vec<DailyAggregate>,
    pub weekly: Vec<WeeklyAggregate>,
    pub summary: LearningSummary,
}

/// Builds learning records and progress overviews from the stores.
pub struct LearningAnalytics {
    progress: ProgressAdapter,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    calendar: Arc<dyn LocalCalendar>,
}

impl LearningAnalytics {
    pub fn new(progress: ProgressAdapter, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            progress,
            sessions,
            clock: Arc::new(SystemClock),
            calendar: Arc::new(FixedOffsetCalendar::utc()),
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

    /// Daily buckets for the last `window_days` days plus summary figures.
    pub fn learning_record(
        &self,
        user_id: &str,
        window_days: u32,
    ) -> Result<LearningRecord, StoreError> {
        validate_id("user_id", user_id)?;
        if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
            return Err(StoreError::validation(
                "window_days",
                format!("{window_days} is outside 1..={MAX_WINDOW_DAYS}"),
            ));
        }

        let today = self.calendar.date_of(self.clock.now());
        let span = window_days.max(SUMMARY_SPAN_DAYS);
        let since = self.calendar.start_of(first_day(today, span));

        let recent = self.sessions.list_sessions(user_id, Some(since))?;
        let history = self.sessions.list_sessions(user_id, None)?;
        debug!(
            user_id,
            recent = recent.len(),
            lifetime = history.len(),
            "building learning record"
        );

        Ok(build_learning_record(
            &recent,
            &history,
            today,
            window_days,
            self.calendar.as_ref(),
        ))
    }

    /// Mastery and due-count snapshot over all of the user's items.
    pub fn progress_overview(&self, user_id: &str) -> Result<ProgressOverview, StoreError> {
        let records = self.progress.list(user_id)?;
        Ok(progress_overview(&records, self.clock.now()))
    }
}

fn first_day(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_signed(Duration::days(i64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

/// Assemble a learning record from already-fetched sessions.
///
/// `recent` must cover at least the last `max(window_days, 30)` days;
/// `history` is every session of the user. `window_days` is clamped to
/// 1..=[`MAX_WINDOW_DAYS`].
pub fn build_learning_record(
    recent: &[SessionSummary],
    history: &[SessionSummary],
    today: NaiveDate,
    window_days: u32,
    calendar: &dyn LocalCalendar,
) -> LearningRecord {
    let window_days = window_days.clamp(1, MAX_WINDOW_DAYS);
    let span = window_days.max(SUMMARY_SPAN_DAYS);
    let buckets = daily_buckets(recent, first_day(today, span), today, calendar);

    let last_n = |n: u32| Totals::sum(buckets.iter().rev().take(n as usize).map(|b| &b.totals));
    let study_days: BTreeSet<NaiveDate> = history
        .iter()
        .map(|s| calendar.date_of(s.start_time))
        .collect();
    let streaks = compute_streaks(&study_days, today);

    let summary = LearningSummary {
        today: last_n(1),
        last_7_days: last_n(7),
        last_30_days: last_n(30),
        lifetime: Totals::from_sessions(history),
        current_streak: streaks.current_streak,
        longest_streak: streaks.longest_streak,
    };

    let daily = buckets[buckets.len().saturating_sub(window_days as usize)..].to_vec();
    let weekly = weekly_rollup(&daily);
    LearningRecord {
        daily,
        weekly,
        summary,
    }
}
