//! JSONL egress - raw readings and daily totals on disk
//!
//! Records are written one JSON object per line. Raw extraction writes
//! one file per date into a directory; the daily job reads the whole
//! directory back.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// JSONL writer for one file
pub struct Egress {
    file_path: PathBuf,
    truncate: bool,
}

impl Egress {
    /// Writer appending to the file
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        debug!(file_path = %file_path.display(), "egress_initialized");
        Self { file_path, truncate: false }
    }

    /// Writer replacing the file content on each write
    pub fn overwrite<P: AsRef<Path>>(file_path: P) -> Self {
        Self { truncate: true, ..Self::new(file_path) }
    }

    /// Write all records, returns the number written
    pub fn write_records<T: Serialize>(&self, records: &[T]) -> anyhow::Result<usize> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!self.truncate)
            .truncate(self.truncate)
            .open(&self.file_path)
            .with_context(|| format!("Failed to open {}", self.file_path.display()))?;
        let mut writer = BufWriter::new(file);

        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        debug!(file = %self.file_path.display(), records = %records.len(), "egress_written");
        Ok(records.len())
    }
}

/// Read every record of a JSONL file. Malformed lines are skipped.
pub fn read_records<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<T>> {
    let path = path.as_ref();
    let file = fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(file = %path.display(), line = line_no + 1, error = %e, "egress_line_skipped")
            }
        }
    }
    Ok(records)
}

/// Read every `*.jsonl` file of a directory, in file name order
pub fn read_dir_records<T: DeserializeOwned, P: AsRef<Path>>(dir: P) -> anyhow::Result<Vec<T>> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    files.sort();

    let mut records = Vec::new();
    for file in &files {
        records.extend(read_records(file)?);
    }
    info!(dir = %dir.display(), files = %files.len(), records = %records.len(), "egress_dir_loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{DailyTraffic, RawReading};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn reading(day: u32, count: i64) -> RawReading {
        RawReading {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            hour: 12,
            store: "Lille".to_string(),
            sensor_id: Some(0),
            count,
            units: "visitors".to_string(),
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2024-01-08.jsonl");

        let egress = Egress::new(&path);
        assert_eq!(egress.write_records(&[reading(8, 10), reading(8, 11)]).unwrap(), 2);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["store"], "Lille");
        assert_eq!(parsed["date"], "2024-01-08");

        let back: Vec<RawReading> = read_records(&path).unwrap();
        assert_eq!(back, vec![reading(8, 10), reading(8, 11)]);
    }

    #[test]
    fn test_append_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"existing\":\"data\"}\n").unwrap();

        Egress::new(&path).write_records(&[reading(8, 1)]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().next().unwrap().contains("existing"));
    }

    #[test]
    fn test_overwrite_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daily.jsonl");
        let egress = Egress::overwrite(&path);
        let row = DailyTraffic {
            date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            store: "Paris".to_string(),
            traffic: 900,
        };
        egress.write_records(&[row.clone(), row.clone()]).unwrap();
        egress.write_records(&[row.clone()]).unwrap();
        let back: Vec<DailyTraffic> = read_records(&path).unwrap();
        assert_eq!(back, vec![row]);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("data").join("raw").join("2024-01-08.jsonl");
        Egress::new(&nested).write_records(&[reading(8, 3)]).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_read_dir_skips_other_files_and_bad_lines() {
        let dir = tempdir().unwrap();
        Egress::new(dir.path().join("2024-01-09.jsonl")).write_records(&[reading(9, 2)]).unwrap();
        Egress::new(dir.path().join("2024-01-08.jsonl")).write_records(&[reading(8, 1)]).unwrap();
        fs::write(dir.path().join("notes.txt"), "not json").unwrap();
        fs::write(dir.path().join("2024-01-10.jsonl"), "garbage\n\n").unwrap();

        let rows: Vec<RawReading> = read_dir_records(dir.path()).unwrap();
        assert_eq!(rows, vec![reading(8, 1), reading(9, 2)]);
    }

    #[test]
    fn test_read_missing_file_fails() {
        let result: anyhow::Result<Vec<RawReading>> = read_records("/nonexistent/file.jsonl");
        assert!(result.is_err());
    }
}
