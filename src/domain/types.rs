//! Shared types for the traffic simulator

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Hours (inclusive) during which a store can report traffic
pub const OPEN_HOURS: [u32; 13] = [9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21];

/// First and last open hour
pub const OPENING_HOUR: u32 = OPEN_HOURS[0];
pub const CLOSING_HOUR: u32 = OPEN_HOURS[OPEN_HOURS.len() - 1];

/// Count reported for every open hour of a closed day (Sunday)
pub const CLOSED_DAY_COUNT: i64 = -1;

/// Unit label attached to every exported reading
pub const VISITOR_UNITS: &str = "visitors";

/// Check whether an hour falls inside [`OPEN_HOURS`]
#[inline]
pub fn is_open_hour(hour: u32) -> bool {
    OPEN_HOURS.contains(&hour)
}

/// Days since 0001-01-01 (which is day 1); the seed of every daily stream
#[inline]
pub fn date_ordinal(date: NaiveDate) -> u32 {
    // num_days_from_ce is 1-based on 0001-01-01, always positive for CE dates
    date.num_days_from_ce().max(0) as u32
}

/// Sunday is the closed day
#[inline]
pub fn is_closed_day(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}

/// Multiplier applied to every hourly value, keyed by weekday.
/// Returns `None` for the closed day.
pub fn weekday_multiplier(weekday: Weekday) -> Option<f64> {
    match weekday {
        Weekday::Wed => Some(1.15),
        Weekday::Fri => Some(1.2),
        Weekday::Sat => Some(1.35),
        Weekday::Sun => None,
        Weekday::Mon | Weekday::Tue | Weekday::Thu => Some(1.0),
    }
}

/// Outcome of a single sensor query.
///
/// The plain integer API encodes these as sentinels: [`as_count`] maps
/// `ClosedHour` and `Broken` to 0 and `ClosedDay` to -1.
///
/// [`as_count`]: VisitReading::as_count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum VisitReading {
    /// Normal reading
    Count(i64),
    /// Malfunctioning sensor, value scaled down to 20%
    Undercount(i64),
    /// Hour outside the opening hours
    ClosedHour,
    /// Sunday
    ClosedDay,
    /// Sensor inoperative for the day
    Broken,
}

impl VisitReading {
    /// Sentinel-encoded count
    pub fn as_count(&self) -> i64 {
        match self {
            VisitReading::Count(n) | VisitReading::Undercount(n) => *n,
            VisitReading::ClosedHour | VisitReading::Broken => 0,
            VisitReading::ClosedDay => CLOSED_DAY_COUNT,
        }
    }

    /// True when the sensor faulted (break or malfunction)
    pub fn is_faulted(&self) -> bool {
        matches!(self, VisitReading::Undercount(_) | VisitReading::Broken)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitReading::Count(_) => "count",
            VisitReading::Undercount(_) => "undercount",
            VisitReading::ClosedHour => "closed_hour",
            VisitReading::ClosedDay => "closed_day",
            VisitReading::Broken => "broken",
        }
    }
}

/// One sensor reading for one hour, as written by the extraction job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawReading {
    pub date: NaiveDate,
    pub hour: u32,
    pub store: String,
    /// Absent for store-level rows
    #[serde(default)]
    pub sensor_id: Option<usize>,
    pub count: i64,
    pub units: String,
}

/// Total traffic of one store for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTraffic {
    pub date: NaiveDate,
    pub store: String,
    pub traffic: i64,
}
