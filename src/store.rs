use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::models::DailyRecord;
use crate::source;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Replaced,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub replaced: usize,
}

/// Reads the log file; a missing file is an empty log.
pub fn read_log(path: &Path) -> anyhow::Result<Vec<DailyRecord>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "log file absent, starting empty");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err).with_context(|| format!("failed to read {}", path.display())),
    };

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    source::parse_entries(&text).with_context(|| format!("{} is not a valid daily log", path.display()))
}

pub fn write_log(path: &Path, records: &[DailyRecord]) -> anyhow::Result<()> {
    let mut body = serde_json::to_string_pretty(records)?;
    body.push('\n');
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Replaces the entry with the same date in place, or appends a new one.
pub fn upsert(records: &mut Vec<DailyRecord>, entry: DailyRecord) -> Upsert {
    match records.iter_mut().find(|existing| existing.date == entry.date) {
        Some(existing) => {
            *existing = entry;
            Upsert::Replaced
        }
        None => {
            records.push(entry);
            Upsert::Added
        }
    }
}

pub fn log_entry(path: &Path, entry: DailyRecord) -> anyhow::Result<Upsert> {
    let mut records = read_log(path)?;
    let date = entry.date;
    let outcome = upsert(&mut records, entry);
    write_log(path, &records)?;
    info!(path = %path.display(), %date, ?outcome, "logged daily entry");
    Ok(outcome)
}

pub fn import_csv(path: &Path, csv_path: &Path) -> anyhow::Result<ImportSummary> {
    #[derive(Deserialize)]
    struct CsvRow {
        date: String,
        #[serde(default)]
        score: Option<f64>,
        #[serde(default)]
        time_spent: Option<f64>,
        #[serde(default)]
        bounty: Option<f64>,
        #[serde(default)]
        notes: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut records = read_log(path)?;
    let mut summary = ImportSummary::default();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("bad CSV row {}", line + 1))?;
        let date: NaiveDate = source::parse_date(&row.date)?;
        let mut entry = DailyRecord::new(
            date,
            non_negative(row.score, "score", line)?,
            non_negative(row.time_spent, "time_spent", line)?,
            non_negative(row.bounty, "bounty", line)?,
        );
        entry.notes = row.notes.filter(|n| !n.trim().is_empty());

        match upsert(&mut records, entry) {
            Upsert::Added => summary.added += 1,
            Upsert::Replaced => summary.replaced += 1,
        }
    }

    write_log(path, &records)?;
    info!(path = %path.display(), added = summary.added, replaced = summary.replaced, "imported CSV");
    Ok(summary)
}

fn non_negative(value: Option<f64>, field: &str, line: usize) -> anyhow::Result<f64> {
    let value = value.unwrap_or(0.0);
    anyhow::ensure!(
        value.is_finite() && value >= 0.0,
        "CSV row {}: `{field}` must be non-negative, got {value}",
        line + 1
    );
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, n).expect("valid day")
    }

    #[test]
    fn upsert_replaces_same_day_in_place() {
        let mut records = vec![
            DailyRecord::new(day(1), 1.0, 0.0, 0.0),
            DailyRecord::new(day(2), 2.0, 0.0, 0.0),
        ];
        assert_eq!(upsert(&mut records, DailyRecord::new(day(1), 9.0, 0.0, 0.0)), Upsert::Replaced);
        assert_eq!(upsert(&mut records, DailyRecord::new(day(3), 3.0, 0.0, 0.0)), Upsert::Added);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].score, 9.0);
        assert_eq!(records[2].date, day(3));
    }

    #[test]
    fn logging_creates_and_updates_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("data.json");

        let mut first = DailyRecord::new(day(5), 40.0, 90.0, 0.0);
        first.notes = Some("warm-up".to_string());
        assert_eq!(log_entry(&path, first).expect("log"), Upsert::Added);
        assert_eq!(
            log_entry(&path, DailyRecord::new(day(5), 55.0, 95.0, 10.0)).expect("log"),
            Upsert::Replaced
        );

        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.contains("\"time_spent\": 95,"), "{text}");
        assert!(!text.contains("95.0"), "{text}");
        let records = source::parse_records(&text).expect("valid log");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, 55.0);
        assert!(records[0].notes.is_none());
    }

    #[test]
    fn whole_amounts_are_written_as_integers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            "[{\"date\": \"2024-03-01\", \"score\": 80, \"time_spent\": 30, \"bounty\": 0}]",
        )
        .expect("seed");

        log_entry(&path, DailyRecord::new(day(2), 12.5, 45.0, 0.25)).expect("log");

        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.contains("\"score\": 80,"), "{text}");
        assert!(text.contains("\"bounty\": 0\n"), "{text}");
        assert!(text.contains("\"score\": 12.5,"), "{text}");
        assert!(text.contains("\"bounty\": 0.25"), "{text}");
        assert!(!text.contains(".0,"), "{text}");
    }

    #[test]
    fn corrupt_log_is_not_overwritten() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{oops").expect("seed");

        assert!(log_entry(&path, DailyRecord::new(day(1), 1.0, 1.0, 1.0)).is_err());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "{oops");
    }

    #[test]
    fn imports_csv_rows_with_optional_columns() {
        let dir = tempfile::tempdir().expect("temp dir");
        let log = dir.path().join("data.json");
        let csv_path = dir.path().join("history.csv");
        std::fs::write(
            &csv_path,
            "date,score,time_spent,bounty,notes\n2024-04-01,80,120,0,first\n2024-04-02,,60,,\n2024-04-01,85,130,5,redo\n",
        )
        .expect("seed csv");

        let summary = import_csv(&log, &csv_path).expect("import");
        assert_eq!(summary, ImportSummary { added: 2, replaced: 1 });

        let records = read_log(&log).expect("read log");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score, 85.0);
        assert_eq!(records[0].notes.as_deref(), Some("redo"));
        assert_eq!(records[1].score, 0.0);
        assert_eq!(records[1].time_spent, 60.0);
    }

    #[test]
    fn csv_with_bad_date_aborts_without_writing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let log = dir.path().join("data.json");
        let csv_path = dir.path().join("history.csv");
        std::fs::write(&csv_path, "date,score\nyesterday,5\n").expect("seed csv");

        assert!(import_csv(&log, &csv_path).is_err());
        assert!(!log.exists());
    }
}
