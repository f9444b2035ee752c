//! Extraction and daily aggregation jobs, driven by the two batch binaries

use crate::domain::types::{DailyTraffic, RawReading};
use crate::io::egress::{read_dir_records, Egress};
use crate::services::daily::{daily_traffic_per_store, fault_summary, readings_for_date};
use crate::services::registry::StoreRegistry;
use anyhow::bail;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

/// Totals of one extraction run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractSummary {
    pub dates: usize,
    pub rows: usize,
    pub broken_sensors: usize,
    pub undercounting_sensors: usize,
}

/// Raw file of one date under `output_dir`
pub fn raw_file_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
}

/// Write the raw readings of every date in `[from, to]`, one file per date.
///
/// Existing files are replaced, so re-running a range is idempotent.
pub fn extract_dates(
    registry: &StoreRegistry,
    from: NaiveDate,
    to: NaiveDate,
    output_dir: &Path,
) -> anyhow::Result<ExtractSummary> {
    if from > to {
        bail!("Extraction range is empty: {from} is after {to}");
    }

    let mut summary = ExtractSummary::default();
    for date in from.iter_days().take_while(|d| *d <= to) {
        let rows = readings_for_date(registry, date);
        let written = Egress::overwrite(raw_file_path(output_dir, date)).write_records(&rows)?;
        let (broken, undercount) = fault_summary(registry, date);

        info!(
            date = %date,
            rows = %written,
            broken_sensors = %broken,
            undercounting_sensors = %undercount,
            "date_extracted"
        );

        summary.dates += 1;
        summary.rows += written;
        summary.broken_sensors += broken;
        summary.undercounting_sensors += undercount;
    }
    Ok(summary)
}

/// Aggregate every raw file under `input_dir` into daily per-store totals
/// written to `output`. Returns the rows written.
pub fn aggregate_daily(input_dir: &Path, output: &Path) -> anyhow::Result<Vec<DailyTraffic>> {
    let rows: Vec<RawReading> = read_dir_records(input_dir)?;
    let daily = daily_traffic_per_store(&rows);
    Egress::overwrite(output).write_records(&daily)?;
    info!(input_rows = %rows.len(), daily_rows = %daily.len(), output = %output.display(), "daily_written");
    Ok(daily)
}
