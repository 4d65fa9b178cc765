//! Clock and local calendar-day boundaries.
//!
//! Due dates and daily statistics are computed in the learner's local
//! calendar. Both the current instant and the day boundary are passed in
//! explicitly so tests can pin them; nothing here reads the system timezone.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Maps instants to local calendar dates and back.
pub trait LocalCalendar: Send + Sync {
    /// Local calendar date containing `at`.
    fn date_of(&self, at: DateTime<Utc>) -> NaiveDate;

    /// Instant of local midnight at the start of `date`.
    fn start_of(&self, date: NaiveDate) -> DateTime<Utc>;

    /// Local midnight `days` calendar days after the day containing `from`.
    fn start_of_day_after(&self, from: DateTime<Utc>, days: u32) -> DateTime<Utc> {
        self.start_of(self.date_of(from) + Duration::days(i64::from(days)))
    }
}

/// Calendar with a constant UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetCalendar {
    offset: FixedOffset,
}

impl FixedOffsetCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// `None` unless the offset is strictly within +/- 24h.
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for FixedOffsetCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl LocalCalendar for FixedOffsetCalendar {
    fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    fn start_of(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        // A fixed offset has no gaps or folds, so the mapping is unique.
        match self.offset.from_local_datetime(&midnight).single() {
            Some(local) => local.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&midnight),
        }
    }
}
