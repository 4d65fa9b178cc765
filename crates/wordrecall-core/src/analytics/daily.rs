//! Day and week buckets of study activity.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::LocalCalendar;
use crate::models::SessionSummary;

/// Accuracy as a percentage with one decimal, 0 when nothing was answered.
pub fn accuracy(correct: u64, completed: u64) -> f64 {
    if completed == 0 {
        return 0.0;
    }
    (correct as f64 / completed as f64 * 1000.0).round() / 10.0
}

/// Totals over any span of sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub study_minutes: u64,
    pub completed_count: u64,
    pub correct_count: u64,
    pub session_count: u64,
    pub accuracy: f64,
}

impl Totals {
    fn add_session(&mut self, session: &SessionSummary) {
        self.study_minutes += session.duration_minutes();
        self.completed_count += u64::from(session.completed_items);
        self.correct_count += u64::from(session.correct_answers);
        self.session_count += 1;
    }

    fn add(&mut self, other: &Totals) {
        self.study_minutes += other.study_minutes;
        self.completed_count += other.completed_count;
        self.correct_count += other.correct_count;
        self.session_count += other.session_count;
    }

    fn finish(mut self) -> Self {
        self.accuracy = accuracy(self.correct_count, self.completed_count);
        self
    }

    /// Totals over every session in `sessions`.
    pub fn from_sessions<'a>(sessions: impl IntoIterator<Item = &'a SessionSummary>) -> Self {
        let mut totals = Totals::default();
        for session in sessions {
            totals.add_session(session);
        }
        totals.finish()
    }

    /// Sum of already-computed totals.
    pub fn sum<'a>(parts: impl IntoIterator<Item = &'a Totals>) -> Self {
        let mut totals = Totals::default();
        for part in parts {
            totals.add(part);
        }
        totals.finish()
    }
}

/// Activity on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Activity in one Monday-based week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyAggregate {
    pub week_start: NaiveDate,
    /// Number of days of this week inside the reporting window.
    pub days: u32,
    #[serde(flatten)]
    pub totals: Totals,
}

/// One bucket per day from `first` to `last` inclusive, zero-filled, each
/// holding the sessions whose start falls on that local day.
pub fn daily_buckets(
    sessions: &[SessionSummary],
    first: NaiveDate,
    last: NaiveDate,
    calendar: &dyn LocalCalendar,
) -> Vec<DailyAggregate> {
    let mut by_day: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
    let mut day = Some(first);
    while let Some(d) = day.filter(|d| *d <= last) {
        by_day.insert(d, Totals::default());
        day = d.succ_opt();
    }

    for session in sessions {
        if let Some(totals) = by_day.get_mut(&calendar.date_of(session.start_time)) {
            totals.add_session(session);
        }
    }

    by_day
        .into_iter()
        .map(|(date, totals)| DailyAggregate {
            date,
            totals: totals.finish(),
        })
        .collect()
}

/// Group consecutive daily buckets by week, keeping their order.
pub fn weekly_rollup(daily: &[DailyAggregate]) -> Vec<WeeklyAggregate> {
    let mut weeks: Vec<WeeklyAggregate> = Vec::new();
    for day in daily {
        let back = Duration::days(i64::from(day.date.weekday().num_days_from_monday()));
        let week_start = day.date.checked_sub_signed(back).unwrap_or(NaiveDate::MIN);
        match weeks.last_mut() {
            Some(week) if week.week_start == week_start => {
                week.days += 1;
                week.totals.add(&day.totals);
            }
            _ => {
                let mut totals = Totals::default();
                totals.add(&day.totals);
                weeks.push(WeeklyAggregate {
                    week_start,
                    days: 1,
                    totals,
                });
            }
        }
    }
    for week in &mut weeks {
        week.totals = week.totals.finish();
    }
    weeks
}
