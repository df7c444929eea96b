//! Service-day arithmetic in the agency timezone.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// One calendar day of service in the agency timezone.
///
/// The corresponding service period extends well past its nominal midnight:
/// overnight trips up to 26 hours in still belong to this date, so
/// seconds-since-midnight values above 86 400 are routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceDate(NaiveDate);

impl ServiceDate {
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The service date a wall-clock instant falls on. Out-of-range
    /// timestamps clamp to the epoch rather than failing; the scheduler only
    /// ever hands us the current time.
    #[must_use]
    pub fn from_timestamp(timestamp: i64, timezone: Tz) -> Self {
        let utc = DateTime::from_timestamp(timestamp, 0).unwrap_or(DateTime::UNIX_EPOCH);
        Self(utc.with_timezone(&timezone).date_naive())
    }

    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.0
    }

    #[must_use]
    pub fn previous(self) -> Self {
        Self(self.0.pred_opt().unwrap_or(self.0))
    }

    /// The agency's `YYYYMMDD` rendering used in trip descriptors.
    #[must_use]
    pub fn yyyymmdd(self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Epoch second of this date's nominal midnight. `None` only for dates
    /// the timezone cannot place (never the case for the agency timezone).
    #[must_use]
    pub fn start_epoch(self, timezone: Tz) -> Option<i64> {
        timezone
            .from_local_datetime(&self.0.and_time(NaiveTime::MIN))
            .earliest()
            .map(|midnight| midnight.timestamp())
    }

    /// Seconds between this date's nominal midnight and `timestamp`.
    /// Negative before midnight, and past 86 400 late in the service day.
    #[must_use]
    pub fn seconds_into_day(self, timestamp: i64, timezone: Tz) -> Option<i64> {
        self.start_epoch(timezone).map(|start| timestamp - start)
    }
}
