// Family calendar clock
//
// Every "what day is it" question is answered here against the family's IANA zone.
// Nothing in this module reads the wall clock: callers pass the instant explicitly.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TimeZoneError;
use crate::types::Weekday;

const FALLBACK_ZONE: &str = "UTC";

/// Half-open interval `[start, end)` covering one family-local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayBounds {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// 24 hours except on DST transition days.
    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

/// A resolved family timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeZoneClock {
    zone: Tz,
    name: String,
    fallback: bool,
}

impl TimeZoneClock {
    /// Strict resolution, used when a zone is being configured.
    pub fn resolve(name: &str) -> Result<Self, TimeZoneError> {
        let trimmed = name.trim();
        let zone = trimmed.parse::<Tz>().map_err(|err| TimeZoneError {
            zone: name.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self { zone, name: trimmed.to_string(), fallback: false })
    }

    /// Lenient resolution for stored zones: an unresolvable name falls back to UTC day
    /// boundaries and is logged, never surfaced.
    pub fn for_zone(name: &str) -> Self {
        match Self::resolve(name) {
            Ok(clock) => clock,
            Err(err) => {
                warn!("{}; falling back to {} day boundaries", err, FALLBACK_ZONE);
                Self { zone: Tz::UTC, name: FALLBACK_ZONE.to_string(), fallback: true }
            }
        }
    }

    /// The zone configured on this device, or UTC when it cannot be determined.
    pub fn device_zone_name() -> String {
        match iana_time_zone::get_timezone() {
            Ok(name) if Self::resolve(&name).is_ok() => name,
            Ok(name) => {
                warn!("Device time zone '{}' is not a known IANA zone, using UTC", name);
                FALLBACK_ZONE.to_string()
            }
            Err(err) => {
                warn!("Cannot determine device time zone ({}), using UTC", err);
                FALLBACK_ZONE.to_string()
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the requested zone could not be resolved and UTC is used instead.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// The family-local calendar date `instant` falls on.
    pub fn calendar_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.zone).date_naive()
    }

    /// Absolute instant of local midnight on `date`. When midnight is skipped by a DST
    /// change the first existing local hour of the date is used.
    pub fn start_of_date(&self, date: NaiveDate) -> DateTime<Utc> {
        for hour in 0..24 {
            let Some(local) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            match self.zone.from_local_datetime(&local) {
                LocalResult::Single(start) => return start.with_timezone(&Utc),
                LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
                LocalResult::None => continue,
            }
        }

        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
    }

    pub fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.start_of_date(self.calendar_day(instant))
    }

    /// Bounds of `date`. `end` is the next local midnight, so the interval is 23 or 25
    /// hours long on DST transition days and 24 hours otherwise.
    pub fn date_bounds(&self, date: NaiveDate) -> DayBounds {
        let start = self.start_of_date(date);
        let end = date
            .succ_opt()
            .map(|next| self.start_of_date(next))
            .unwrap_or_else(|| start + Duration::hours(24));

        DayBounds { start, end }
    }

    pub fn day_bounds(&self, instant: DateTime<Utc>) -> DayBounds {
        self.date_bounds(self.calendar_day(instant))
    }

    pub fn weekday(&self, instant: DateTime<Utc>) -> Weekday {
        Weekday::of_date(self.calendar_day(instant))
    }
}

/// Local midnight (as UTC) of the day `instant` falls on in `timezone`.
pub fn start_of_day(timezone: &str, instant: DateTime<Utc>) -> DateTime<Utc> {
    TimeZoneClock::for_zone(timezone).start_of_day(instant)
}

/// Bounds of the local day `instant` falls on in `timezone`. `end` is the next local
/// midnight: `start + 24h` except on DST transition days, where the day is 23 or 25 hours
/// long and `start <= instant < end` still holds.
pub fn day_bounds(timezone: &str, instant: DateTime<Utc>) -> DayBounds {
    TimeZoneClock::for_zone(timezone).day_bounds(instant)
}

/// Weekday of `instant` in `timezone`.
///
/// An unresolvable zone yields `SUN`. This is a last-resort display fallback; scheduling
/// derives weekdays from the calendar day instead and never depends on it.
pub fn weekday_key(timezone: &str, instant: DateTime<Utc>) -> Weekday {
    match TimeZoneClock::resolve(timezone) {
        Ok(clock) => clock.weekday(instant),
        Err(err) => {
            warn!("{}; weekday defaults to SUN", err);
            Weekday::Sun
        }
    }
}
