//! Daily per-store traffic from raw sensor readings
//!
//! Raw extraction files can overlap (re-runs over the same dates), so rows
//! are de-duplicated before summing. Only sensor-level visitor rows count.

use crate::domain::types::{DailyTraffic, RawReading, VisitReading, OPEN_HOURS, VISITOR_UNITS};
use crate::services::registry::StoreRegistry;
use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use tracing::debug;

/// All sensor readings of every store for one date, hour by hour
pub fn readings_for_date(registry: &StoreRegistry, date: NaiveDate) -> Vec<RawReading> {
    let mut rows = Vec::with_capacity(registry.len() * OPEN_HOURS.len() * 5);
    for store in registry.iter() {
        for (sensor_id, sensor) in store.sensors().iter().enumerate() {
            for hour in OPEN_HOURS {
                rows.push(RawReading {
                    date,
                    hour,
                    store: store.name().to_string(),
                    sensor_id: Some(sensor_id),
                    count: sensor.get_visit_count(date, hour),
                    units: VISITOR_UNITS.to_string(),
                });
            }
        }
    }
    rows
}

/// Count readings by status, for extraction logs
pub fn fault_summary(registry: &StoreRegistry, date: NaiveDate) -> (usize, usize) {
    let mut broken = 0;
    let mut undercount = 0;
    for store in registry.iter() {
        for (sensor_id, sensor) in store.sensors().iter().enumerate() {
            // The fault roll is per day, any open hour tells
            let reading = sensor.reading(date, OPEN_HOURS[0]);
            match reading {
                VisitReading::Broken => broken += 1,
                VisitReading::Undercount(_) => undercount += 1,
                _ => continue,
            }
            debug!(%date, store = %store.name(), sensor_id, status = reading.as_str(), "sensor_faulted");
        }
    }
    (broken, undercount)
}

/// Sum visitor readings per (date, store), ordered by date then store.
///
/// Duplicate rows are counted once; rows with other units or without a
/// sensor id are ignored.
pub fn daily_traffic_per_store<'a, I>(rows: I) -> Vec<DailyTraffic>
where
    I: IntoIterator<Item = &'a RawReading>,
{
    let mut seen: FxHashSet<&RawReading> = FxHashSet::default();
    let mut totals: BTreeMap<(NaiveDate, &str), i64> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows {
        if !seen.insert(row) {
            skipped += 1;
            continue;
        }
        if row.units != VISITOR_UNITS || row.sensor_id.is_none() {
            skipped += 1;
            continue;
        }
        *totals.entry((row.date, row.store.as_str())).or_insert(0) += row.count;
    }

    debug!(groups = %totals.len(), skipped = %skipped, "daily_traffic_aggregated");

    totals
        .into_iter()
        .map(|((date, store), traffic)| DailyTraffic { date, store: store.to_string(), traffic })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::{Config, StoreConfig};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(date: NaiveDate, hour: u32, store: &str, sensor_id: Option<usize>, count: i64) -> RawReading {
        RawReading {
            date,
            hour,
            store: store.to_string(),
            sensor_id,
            count,
            units: VISITOR_UNITS.to_string(),
        }
    }

    #[test]
    fn test_readings_for_date() {
        let registry = StoreRegistry::from_config(&Config::default()).unwrap();
        let rows = readings_for_date(&registry, ymd(2023, 12, 21));
        assert_eq!(rows.len(), 5 * 5 * OPEN_HOURS.len());
        assert!(rows.iter().all(|r| r.units == "visitors" && r.sensor_id.is_some()));
    }

    #[test]
    fn test_readings_match_store_traffic() {
        let registry = StoreRegistry::new(&[StoreConfig {
            name: "Test".into(),
            avg_visit: 1200.0,
            std_visit: 300.0,
            perc_malfunction: 0.0,
            perc_break: 0.0,
        }])
        .unwrap();
        let rows = readings_for_date(&registry, ymd(2023, 12, 21));
        let at_18: i64 = rows.iter().filter(|r| r.hour == 18).map(|r| r.count).sum();
        assert_eq!(at_18, 111);
    }

    #[test]
    fn test_daily_totals_grouped_and_ordered() {
        let d1 = ymd(2024, 1, 8);
        let d2 = ymd(2024, 1, 9);
        let rows = vec![
            row(d2, 10, "Paris", Some(0), 5),
            row(d1, 10, "Paris", Some(0), 7),
            row(d1, 11, "Paris", Some(1), 3),
            row(d1, 10, "Lille", Some(0), 4),
        ];
        let daily = daily_traffic_per_store(&rows);
        assert_eq!(
            daily,
            vec![
                DailyTraffic { date: d1, store: "Lille".into(), traffic: 4 },
                DailyTraffic { date: d1, store: "Paris".into(), traffic: 10 },
                DailyTraffic { date: d2, store: "Paris".into(), traffic: 5 },
            ]
        );
    }

    #[test]
    fn test_duplicates_and_foreign_rows_skipped() {
        let d = ymd(2024, 1, 8);
        let mut other_units = row(d, 12, "Nancy", Some(0), 100);
        other_units.units = "celsius".to_string();
        let rows = vec![
            row(d, 12, "Nancy", Some(0), 9),
            row(d, 12, "Nancy", Some(0), 9),
            row(d, 12, "Nancy", None, 50),
            other_units,
        ];
        let daily = daily_traffic_per_store(&rows);
        assert_eq!(daily, vec![DailyTraffic { date: d, store: "Nancy".into(), traffic: 9 }]);
    }

    #[test]
    fn test_fault_summary_forced_faults() {
        let registry = StoreRegistry::new(&[StoreConfig {
            name: "Faulty".into(),
            avg_visit: 1000.0,
            std_visit: 10.0,
            perc_malfunction: 1.0,
            perc_break: 0.0,
        }])
        .unwrap();
        assert_eq!(fault_summary(&registry, ymd(2023, 12, 21)), (0, 5));
    }
}
