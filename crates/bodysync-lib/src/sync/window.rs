//! Fetch window computation

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Seconds added to the start of the end date to cover that whole day
const END_OF_DAY_SECS: i64 = 24 * 60 * 60 - 1;

/// Time range fetched in one run, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// True when `start` came from the stored checkpoint rather than a requested date
    pub from_checkpoint: bool,
}

impl SyncWindow {
    /// Window for an explicitly requested start date
    pub fn explicit(from_date: NaiveDate, to_date: NaiveDate) -> Self {
        Self {
            start: start_of_day(from_date),
            end: end_of_day(to_date),
            from_checkpoint: false,
        }
    }

    /// Window starting at the stored checkpoint
    pub fn from_checkpoint(checkpoint: DateTime<Utc>, to_date: NaiveDate) -> Self {
        Self {
            start: checkpoint,
            end: end_of_day(to_date),
            from_checkpoint: true,
        }
    }

    /// Where the checkpoint moves after a successful run; never past `now`,
    /// so measurements taken later on the end date are fetched next time.
    pub fn checkpoint_target(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.end.min(now)
    }
}

/// Midnight at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Last second of `date`
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::seconds(END_OF_DAY_SECS)
}
