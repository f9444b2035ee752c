//! Traffic sensor - deterministic hourly visitor counts
//!
//! Every query re-seeds a local generator from the date ordinal, so a
//! sensor holds no random state and answers the same (date, hour) pair
//! identically across calls, threads and processes.
//!
//! Stream layout for a given date (both streams start from the same seed):
//! - fault roll: the first uniform double
//! - hourly shape: the first 13 normal draws

use crate::domain::error::{require_count, require_finite, require_rate, SimError};
use crate::domain::mt19937::Mt19937;
use crate::domain::types::{
    date_ordinal, is_closed_day, is_open_hour, weekday_multiplier, VisitReading, OPEN_HOURS,
};
use chrono::{Datelike, NaiveDate};
use rand::SeedableRng;
use tracing::trace;

/// Default probability that a sensor is inoperative on a given day
pub const DEFAULT_PERC_BREAK: f64 = 0.015;

/// Default probability that a sensor undercounts on a given day
pub const DEFAULT_PERC_MALFUNCTION: f64 = 0.035;

/// Scale applied to every hourly value of a malfunctioning sensor
pub const MALFUNCTION_SCALE: f64 = 0.2;

/// Fresh generator for one day, seeded with the date ordinal
fn day_stream(date: NaiveDate) -> Mt19937 {
    Mt19937::from_seed(date_ordinal(date).to_le_bytes())
}

/// A single traffic sensor
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    /// Mean total daily visits (integer-truncated at construction)
    avg_visit: i64,
    /// Standard deviation of the daily count
    std_visit: f64,
    perc_break: f64,
    perc_malfunction: f64,
}

impl Sensor {
    /// Create a sensor with the default break/malfunction rates
    pub fn new(avg_visit: f64, std_visit: f64) -> Result<Self, SimError> {
        Self::with_fault_rates(avg_visit, std_visit, DEFAULT_PERC_BREAK, DEFAULT_PERC_MALFUNCTION)
    }

    /// Create a sensor with explicit fault rates.
    ///
    /// Rates of 1 or more force the fault on every day.
    pub fn with_fault_rates(
        avg_visit: f64,
        std_visit: f64,
        perc_break: f64,
        perc_malfunction: f64,
    ) -> Result<Self, SimError> {
        require_count("avg_visit", avg_visit)?;
        let std_visit = require_finite("std_visit", std_visit)?;
        let perc_break = require_rate("perc_break", perc_break)?;
        let perc_malfunction = require_rate("perc_malfunction", perc_malfunction)?;
        Ok(Self::from_validated(avg_visit, std_visit, perc_break, perc_malfunction))
    }

    /// Build from parameters already checked by the caller
    pub(crate) fn from_validated(
        avg_visit: f64,
        std_visit: f64,
        perc_break: f64,
        perc_malfunction: f64,
    ) -> Self {
        Self { avg_visit: avg_visit.trunc() as i64, std_visit, perc_break, perc_malfunction }
    }

    pub fn avg_visit(&self) -> i64 {
        self.avg_visit
    }

    pub fn std_visit(&self) -> f64 {
        self.std_visit
    }

    pub fn perc_break(&self) -> f64 {
        self.perc_break
    }

    pub fn perc_malfunction(&self) -> f64 {
        self.perc_malfunction
    }

    /// Hourly traffic for a whole day, one value per entry of [`OPEN_HOURS`].
    ///
    /// The daily normal draw is spread evenly over the open hours, then
    /// shaped by the weekday multiplier. On Sunday every value is -1.
    /// Values are not floored.
    pub fn simulate_visit_count(&self, date: NaiveDate) -> [f64; OPEN_HOURS.len()] {
        let mut rng = day_stream(date);
        let hours = OPEN_HOURS.len() as f64;
        let loc = self.avg_visit as f64;

        let mut visits = [0.0; OPEN_HOURS.len()];
        for visit in visits.iter_mut() {
            *visit = rng.next_normal(loc, self.std_visit) / hours;
        }

        match weekday_multiplier(date.weekday()) {
            Some(multiplier) => visits.iter_mut().for_each(|v| *v *= multiplier),
            None => visits.iter_mut().for_each(|v| *v = *v * 0.0 - 1.0),
        }
        visits
    }

    /// Classified reading for one hour of one day
    pub fn reading(&self, date: NaiveDate, hour: u32) -> VisitReading {
        let mut rng = day_stream(date);
        let fault_roll = rng.next_f64();

        if !is_open_hour(hour) {
            return VisitReading::ClosedHour;
        }
        if fault_roll < self.perc_break {
            trace!(%date, hour, fault_roll, "sensor_broken");
            return VisitReading::Broken;
        }
        if is_closed_day(date) {
            return VisitReading::ClosedDay;
        }

        let mut visits = self.simulate_visit_count(date);
        let malfunction = fault_roll < self.perc_malfunction;
        if malfunction {
            trace!(%date, hour, fault_roll, "sensor_malfunction");
            visits.iter_mut().for_each(|v| *v *= MALFUNCTION_SCALE);
        }

        match OPEN_HOURS.iter().position(|&h| h == hour) {
            Some(idx) => {
                let count = visits[idx].floor() as i64;
                if malfunction {
                    VisitReading::Undercount(count)
                } else {
                    VisitReading::Count(count)
                }
            }
            None => VisitReading::ClosedHour,
        }
    }

    /// Visitor count for one hour of one day.
    ///
    /// Returns 0 when the sensor is broken or the hour is outside the
    /// opening hours, -1 on Sunday.
    pub fn get_visit_count(&self, date: NaiveDate, hour: u32) -> i64 {
        self.reading(date, hour).as_count()
    }
}
