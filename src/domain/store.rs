//! Store - a fixed set of five sensors sharing the store's traffic
//!
//! Each sensor measures a fixed share of the store's daily visits. The
//! share order is pinned: sensor `i` always gets `TRAFFIC_SHARES[i]`, so
//! sensor ids are stable across runs and deployments.

use crate::domain::error::{require_count, require_finite, require_rate, SimError};
use crate::domain::sensor::Sensor;
use crate::domain::types::VisitReading;
use chrono::NaiveDate;
use tracing::debug;

/// Number of sensors installed in every store
pub const SENSORS_PER_STORE: usize = 5;

/// Traffic share of each sensor, indexed by sensor id.
///
/// This is the order the reference deployment iterated the share set in;
/// the published per-sensor figures depend on it.
pub const TRAFFIC_SHARES: [f64; SENSORS_PER_STORE] = [0.49, 0.07, 0.10, 0.31, 0.03];

/// A store and its sensors
#[derive(Debug, Clone)]
pub struct Store {
    name: String,
    avg_visit: i64,
    std_visit: f64,
    perc_malfunction: f64,
    perc_break: f64,
    seed: u32,
    sensors: [Sensor; SENSORS_PER_STORE],
}

impl Store {
    /// Create a store with no break or malfunction
    pub fn new(name: &str, avg_visit: f64, std_visit: f64) -> Result<Self, SimError> {
        Self::with_fault_rates(name, avg_visit, std_visit, 0.0, 0.0)
    }

    /// Create a store whose sensors all share the given fault rates
    pub fn with_fault_rates(
        name: &str,
        avg_visit: f64,
        std_visit: f64,
        perc_malfunction: f64,
        perc_break: f64,
    ) -> Result<Self, SimError> {
        let avg_visit = require_count("avg_visit", avg_visit)?;
        let std_visit = require_finite("std_visit", std_visit)?;
        let perc_malfunction = require_rate("perc_malfunction", perc_malfunction)?;
        let perc_break = require_rate("perc_break", perc_break)?;

        // Recorded only: sensor parameters come from the shares, not from draws
        let seed = Self::name_seed(name);

        let sensors = TRAFFIC_SHARES.map(|share| {
            Sensor::from_validated(
                share * avg_visit as f64,
                share * std_visit,
                perc_break,
                perc_malfunction,
            )
        });

        debug!(store = %name, seed, avg_visit, std_visit, perc_malfunction, perc_break, "store_created");

        Ok(Self {
            name: name.to_string(),
            avg_visit,
            std_visit,
            perc_malfunction,
            perc_break,
            seed,
            sensors,
        })
    }

    /// Sum of the name's bytes
    pub fn name_seed(name: &str) -> u32 {
        name.bytes().fold(0u32, |acc, b| acc.wrapping_add(u32::from(b)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn avg_visit(&self) -> i64 {
        self.avg_visit
    }

    pub fn std_visit(&self) -> f64 {
        self.std_visit
    }

    pub fn perc_malfunction(&self) -> f64 {
        self.perc_malfunction
    }

    pub fn perc_break(&self) -> f64 {
        self.perc_break
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Traffic of one sensor.
    ///
    /// # Panics
    ///
    /// Panics if `sensor_id >= SENSORS_PER_STORE`; callers bounds-check
    /// (or use [`try_sensor_traffic`](Self::try_sensor_traffic)).
    pub fn sensor_traffic(&self, sensor_id: usize, date: NaiveDate, hour: u32) -> i64 {
        self.sensors[sensor_id].get_visit_count(date, hour)
    }

    /// Traffic of one sensor, `None` for an unknown sensor id
    pub fn try_sensor_traffic(&self, sensor_id: usize, date: NaiveDate, hour: u32) -> Option<i64> {
        self.sensors.get(sensor_id).map(|sensor| sensor.get_visit_count(date, hour))
    }

    /// Classified reading of one sensor, `None` for an unknown sensor id
    pub fn sensor_reading(&self, sensor_id: usize, date: NaiveDate, hour: u32) -> Option<VisitReading> {
        self.sensors.get(sensor_id).map(|sensor| sensor.reading(date, hour))
    }

    /// Traffic of the whole store: the sum of all sensor counts.
    ///
    /// On Sunday this is -1 per sensor that did not break (-5 for a
    /// healthy store), which is not the per-sensor closed sentinel.
    pub fn store_traffic(&self, date: NaiveDate, hour: u32) -> i64 {
        self.sensors.iter().map(|sensor| sensor.get_visit_count(date, hour)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::OPEN_HOURS;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_store() -> Store {
        Store::new("Test", 1200.0, 300.0).unwrap()
    }

    #[test]
    fn test_get_store_traffic() {
        assert_eq!(test_store().store_traffic(ymd(2023, 12, 21), 18), 111);
    }

    #[test]
    fn test_get_sensor_traffic() {
        assert_eq!(test_store().sensor_traffic(3, ymd(2023, 12, 21), 18), 35);
    }

    #[test]
    fn test_every_sensor_reference_values() {
        let store = test_store();
        let counts: Vec<i64> =
            (0..SENSORS_PER_STORE).map(|id| store.sensor_traffic(id, ymd(2023, 12, 21), 18)).collect();
        assert_eq!(counts, vec![55, 7, 11, 35, 3]);
    }

    #[test]
    fn test_sunday_closed() {
        let store = test_store();
        assert_eq!(store.sensor_traffic(2, ymd(2024, 1, 7), 18), -1);
        assert_eq!(store.store_traffic(ymd(2024, 1, 7), 18), -5);
    }

    #[test]
    fn test_sensor_parameters_from_shares() {
        let store = test_store();
        let avgs: Vec<i64> = store.sensors().iter().map(Sensor::avg_visit).collect();
        assert_eq!(avgs, vec![588, 84, 120, 372, 36]);
        assert_eq!(store.sensors()[1].std_visit(), 0.07 * 300.0);
        assert!(store.sensors().iter().all(|s| s.perc_break() == 0.0 && s.perc_malfunction() == 0.0));
    }

    #[test]
    fn test_shares_sum_to_one() {
        let total: f64 = TRAFFIC_SHARES.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fault_rates_passed_down() {
        let store = Store::with_fault_rates("Paris", 8000.0, 800.0, 0.08, 0.1).unwrap();
        for sensor in store.sensors() {
            assert_eq!(sensor.perc_malfunction(), 0.08);
            assert_eq!(sensor.perc_break(), 0.1);
        }
    }

    #[test]
    fn test_name_seed() {
        assert_eq!(Store::name_seed("Test"), 84 + 101 + 115 + 116);
        assert_eq!(test_store().seed(), 416);
        assert_eq!(Store::name_seed(""), 0);
    }

    #[test]
    fn test_store_sum_matches_sensors() {
        let store = Store::with_fault_rates("Lille", 6000.0, 500.0, 0.05, 0.08).unwrap();
        for day in 1..=14 {
            let date = ymd(2023, 3, day);
            for hour in OPEN_HOURS {
                let sum: i64 = (0..SENSORS_PER_STORE).map(|id| store.sensor_traffic(id, date, hour)).sum();
                assert_eq!(store.store_traffic(date, hour), sum);
            }
        }
    }

    #[test]
    fn test_try_sensor_traffic_bounds() {
        let store = test_store();
        assert_eq!(store.try_sensor_traffic(3, ymd(2023, 12, 21), 18), Some(35));
        assert_eq!(store.try_sensor_traffic(5, ymd(2023, 12, 21), 18), None);
        assert_eq!(store.sensor_reading(0, ymd(2024, 1, 7), 18), Some(VisitReading::ClosedDay));
    }

    #[test]
    #[should_panic]
    fn test_sensor_traffic_out_of_range_panics() {
        test_store().sensor_traffic(SENSORS_PER_STORE, ymd(2023, 12, 21), 18);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(Store::new("Bad", f64::NAN, 1.0).is_err());
        assert_eq!(
            Store::with_fault_rates("Bad", 100.0, 1.0, -1.0, 0.0).unwrap_err(),
            SimError::invalid("perc_malfunction", -1.0)
        );
        assert_eq!(
            Store::new("Huge", 1.0e19, 1.0).unwrap_err(),
            SimError::invalid("avg_visit", 1.0e19)
        );
    }
}
