//! Property-based tests for the simulation engine

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use proptest::prelude::*;
use store_traffic_sim::domain::{Sensor, Store, OPEN_HOURS};

fn date_from_offset(days: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(days)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_store_traffic_is_sum_of_sensors(
        days in 0i64..3650,
        hour in 0u32..24,
        avg in 100.0f64..10_000.0,
        std in 0.0f64..1_000.0,
        rates in (0.0f64..0.3, 0.0f64..0.3),
    ) {
        let store = Store::with_fault_rates("Prop", avg, std, rates.0, rates.1).unwrap();
        let date = date_from_offset(days);
        let sum: i64 = (0..store.sensors().len()).map(|i| store.sensor_traffic(i, date, hour)).sum();
        prop_assert_eq!(store.store_traffic(date, hour), sum);
    }

    #[test]
    fn prop_counts_are_deterministic(
        days in 0i64..3650,
        hour in 9u32..=21,
        avg in 1.0f64..10_000.0,
        std in 0.0f64..1_000.0,
    ) {
        let date = date_from_offset(days);
        let a = Sensor::with_fault_rates(avg, std, 0.05, 0.1).unwrap();
        let b = Sensor::with_fault_rates(avg, std, 0.05, 0.1).unwrap();
        prop_assert_eq!(a.get_visit_count(date, hour), b.get_visit_count(date, hour));
        prop_assert_eq!(a.get_visit_count(date, hour), a.get_visit_count(date, hour));
    }

    #[test]
    fn prop_hours_outside_opening_read_zero(days in 0i64..3650, hour in prop_oneof![0u32..9, 22u32..48]) {
        let sensor = Sensor::with_fault_rates(2000.0, 200.0, 0.2, 0.2).unwrap();
        prop_assert_eq!(sensor.get_visit_count(date_from_offset(days), hour), 0);
    }

    #[test]
    fn prop_sunday_is_closed_without_faults(weeks in 0i64..520, hour_idx in 0usize..OPEN_HOURS.len()) {
        // 2020-01-05 is a Sunday
        let sunday = date_from_offset(4 + weeks * 7);
        prop_assert_eq!(sunday.weekday(), Weekday::Sun);

        let store = Store::new("Closed", 3000.0, 500.0).unwrap();
        let hour = OPEN_HOURS[hour_idx];
        prop_assert_eq!(store.store_traffic(sunday, hour), -5);
        for i in 0..store.sensors().len() {
            prop_assert_eq!(store.sensor_traffic(i, sunday, hour), -1);
        }
    }

    #[test]
    fn prop_certain_break_reads_zero(days in 0i64..3650, hour_idx in 0usize..OPEN_HOURS.len()) {
        let sensor = Sensor::with_fault_rates(2000.0, 200.0, 1.0, 0.0).unwrap();
        prop_assert_eq!(sensor.get_visit_count(date_from_offset(days), OPEN_HOURS[hour_idx]), 0);
    }
}
