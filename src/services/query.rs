//! Traffic query validation and answering
//!
//! Applies the API's request rules in front of the simulation core:
//! year floor, calendar validity, no future dates, known store, hour
//! clamping, sensor bounds, and finally the closed check on the count.

use crate::domain::types::{CLOSING_HOUR, OPENING_HOUR};
use crate::services::registry::StoreRegistry;
use chrono::NaiveDate;
use thiserror::Error;

/// A visitor count request, as received (unvalidated)
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficQuery {
    pub store: String,
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
    /// `None` asks for the whole store
    pub sensor_id: Option<i64>,
}

/// Reasons a request gets no visitor count
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("No data before {0}")]
    TooEarly(i32),

    #[error("Enter a valid date")]
    InvalidDate,

    #[error("Choose a date in the past")]
    FutureDate,

    #[error("Store {0} does not exist.")]
    UnknownStore(String),

    #[error("Sensor #{sensor_id} does not exist. This store only have {sensors} sensors.")]
    UnknownSensor { sensor_id: i64, sensors: usize },

    #[error("The store was closed try another date or hour.")]
    Closed,
}

impl QueryError {
    /// Short label used for metrics and logs
    pub fn reason(&self) -> &'static str {
        match self {
            QueryError::TooEarly(_) => "too_early",
            QueryError::InvalidDate => "invalid_date",
            QueryError::FutureDate => "future_date",
            QueryError::UnknownStore(_) => "unknown_store",
            QueryError::UnknownSensor { .. } => "unknown_sensor",
            QueryError::Closed => "closed",
        }
    }
}

/// Answers traffic queries against a store registry
pub struct TrafficService<'a> {
    registry: &'a StoreRegistry,
    min_year: i32,
}

impl<'a> TrafficService<'a> {
    pub fn new(registry: &'a StoreRegistry, min_year: i32) -> Self {
        Self { registry, min_year }
    }

    /// Validate the query and return the visitor count.
    ///
    /// `today` bounds the accepted dates; hours past closing are clamped to
    /// the closing hour.
    pub fn answer(&self, query: &TrafficQuery, today: NaiveDate) -> Result<i64, QueryError> {
        if query.year < i64::from(self.min_year) {
            return Err(QueryError::TooEarly(self.min_year));
        }
        let date = Self::parse_date(query.year, query.month, query.day)?;
        if date > today {
            return Err(QueryError::FutureDate);
        }

        let store = self
            .registry
            .get(&query.store)
            .ok_or_else(|| QueryError::UnknownStore(query.store.clone()))?;

        let hour = query.hour.min(i64::from(CLOSING_HOUR));
        // Negative hours never reach the core; they are closed anyway
        let core_hour = u32::try_from(hour).ok();

        let count = match query.sensor_id {
            None => core_hour.map_or(0, |h| store.store_traffic(date, h)),
            Some(sensor_id) => {
                let sensors = store.sensors().len();
                let idx = usize::try_from(sensor_id)
                    .ok()
                    .filter(|&idx| idx < sensors)
                    .ok_or(QueryError::UnknownSensor { sensor_id, sensors })?;
                core_hour.map_or(0, |h| store.sensor_traffic(idx, date, h))
            }
        };

        if count < 0 || hour < i64::from(OPENING_HOUR) {
            return Err(QueryError::Closed);
        }
        Ok(count)
    }

    fn parse_date(year: i64, month: i64, day: i64) -> Result<NaiveDate, QueryError> {
        let year = i32::try_from(year).map_err(|_| QueryError::InvalidDate)?;
        let month = u32::try_from(month).map_err(|_| QueryError::InvalidDate)?;
        let day = u32::try_from(day).map_err(|_| QueryError::InvalidDate)?;
        NaiveDate::from_ymd_opt(year, month, day).ok_or(QueryError::InvalidDate)
    }
}
