use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;

use super::model::{ColumnType, TabularDataset, Value};
use crate::error::ResampleError;

/// Column names tried, in order, before falling back to the first column.
pub const TIME_COLUMNS: [&str; 6] = [
    "iso_time",
    "ISO_8601_UTC",
    "Time_UTC",
    "datetime",
    "Timestamp",
    "time",
];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// How the rows falling in one time bin are reduced to a single row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// First present value of each column.
    #[default]
    First,
    /// Mean of numeric columns; the time column holds the bin start.
    Mean,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parse a rate such as `60min`, `1H`, `30s` or `1D`. A bare unit means 1.
pub fn parse_rate(rate: &str) -> Result<Duration, ResampleError> {
    let invalid = || ResampleError::InvalidRate(rate.to_string());
    let trimmed = rate.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (count, unit) = trimmed.split_at(split);

    let count: i64 = if count.is_empty() {
        1
    } else {
        count.parse().map_err(|_| invalid())?
    };
    let unit_seconds: i64 = match unit {
        "s" | "S" | "sec" => 1,
        "min" | "T" => 60,
        "h" | "H" => 3_600,
        "d" | "D" => 86_400,
        _ => return Err(invalid()),
    };

    match count.checked_mul(unit_seconds) {
        Some(seconds) if seconds > 0 => Duration::try_seconds(seconds).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Find the column holding timestamps.
pub fn detect_time_column(dataset: &TabularDataset) -> Result<usize, ResampleError> {
    if let Some(idx) = TIME_COLUMNS
        .iter()
        .find_map(|name| dataset.column_index(name))
    {
        return Ok(idx);
    }

    // Fallback: a first column with at least one parseable timestamp
    let first_is_time = !dataset.columns.is_empty()
        && dataset
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_str))
            .any(|s| parse_timestamp(s).is_some());
    if first_is_time {
        Ok(0)
    } else {
        Err(ResampleError::NoTimeColumn {
            name: dataset.source.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Resampling
// ---------------------------------------------------------------------------

/// Re-aggregate `dataset` into bins of width `rate`.
///
/// Bins are aligned to multiples of `rate` since the Unix epoch and emitted in
/// time order. Empty bins produce no row. Rows whose timestamp cannot be
/// parsed are skipped.
pub fn resample(
    dataset: &TabularDataset,
    rate: Duration,
    aggregation: Aggregation,
) -> Result<TabularDataset, ResampleError> {
    let width = rate.num_seconds();
    if width <= 0 {
        return Err(ResampleError::InvalidRate(format!("{rate}")));
    }
    let time_idx = detect_time_column(dataset)?;

    let mut bins: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (r, row) in dataset.rows.iter().enumerate() {
        let stamp = row
            .get(time_idx)
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        match stamp {
            Some(ts) => bins
                .entry(ts.timestamp().div_euclid(width))
                .or_default()
                .push(r),
            None => warn!(
                "{}: data row {}: unparseable timestamp, skipped",
                dataset.source,
                r + 1
            ),
        }
    }

    let rows: Vec<Vec<Value>> = bins
        .iter()
        .map(|(bin, members)| {
            (0..dataset.columns.len())
                .map(|c| {
                    let cells = members.iter().map(|&r| &dataset.rows[r][c]);
                    match aggregation {
                        Aggregation::Mean if c == time_idx => bin_label(bin * width),
                        Aggregation::Mean if dataset.columns[c].kind == ColumnType::Numeric => {
                            mean(cells)
                        }
                        _ => first_present(cells),
                    }
                })
                .collect()
        })
        .collect();

    debug!(
        "{}: resampled {} rows into {} bins of {}s",
        dataset.source,
        dataset.len(),
        rows.len(),
        width
    );

    Ok(TabularDataset {
        source: dataset.source.clone(),
        columns: dataset.columns.clone(),
        rows,
        diagnostics: dataset.diagnostics.clone(),
    })
}

fn first_present<'a>(mut cells: impl Iterator<Item = &'a Value>) -> Value {
    cells
        .find(|v| !v.is_missing())
        .cloned()
        .unwrap_or(Value::Missing)
}

fn mean<'a>(cells: impl Iterator<Item = &'a Value>) -> Value {
    let (sum, n) = cells
        .filter_map(Value::as_f64)
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        Value::Missing
    } else {
        Value::Number(sum / n as f64)
    }
}

fn bin_label(seconds: i64) -> Value {
    DateTime::from_timestamp(seconds, 0).map_or(Value::Missing, |dt| {
        Value::Text(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{extract_table, TableOptions};
    use crate::data::source::Source;

    const TRACK: &str = "\
iso_time,ship_longitude,ship_latitude,speed_made_good,course_made_good
2024-02-17T00:01:00.00Z,-117.0,32.0,1.0,180.0
2024-02-17T00:31:00.00Z,-117.5,32.5,,190.0
2024-02-17T01:05:00.00Z,-118.0,33.0,3.0,200.0
2024-02-17T03:10:00.00Z,-119.0,34.0,4.0,210.0
";

    fn track() -> TabularDataset {
        extract_table(&Source::text("track", TRACK), &TableOptions::default()).unwrap()
    }

    #[test]
    fn rate_spellings() {
        assert_eq!(parse_rate("60min").unwrap(), Duration::minutes(60));
        assert_eq!(parse_rate("1H").unwrap(), Duration::hours(1));
        assert_eq!(parse_rate("30s").unwrap(), Duration::seconds(30));
        assert_eq!(parse_rate("D").unwrap(), Duration::days(1));
        assert_eq!(parse_rate("5T").unwrap(), Duration::minutes(5));
        assert!(parse_rate("0min").is_err());
        assert!(parse_rate("10 parsecs").is_err());
        assert!(parse_rate("").is_err());
    }

    #[test]
    fn timestamp_spellings() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 17)
            .unwrap()
            .and_hms_opt(0, 1, 0)
            .unwrap()
            .and_utc();
        assert_eq!(parse_timestamp("2024-02-17T00:01:00.00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-02-17T00:01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-02-17 00:01:00"), Some(expected));
        assert!(parse_timestamp("2024-02-17").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn time_column_detection() {
        assert_eq!(detect_time_column(&track()).unwrap(), 0);

        let renamed = extract_table(
            &Source::text("r", "lon,Timestamp\n1,2024-01-01T00:00:00Z\n"),
            &TableOptions::default(),
        )
        .unwrap();
        assert_eq!(detect_time_column(&renamed).unwrap(), 1);

        let fallback = extract_table(
            &Source::text("f", "when,lon\n2024-01-01T00:00:00Z,1\n"),
            &TableOptions::default(),
        )
        .unwrap();
        assert_eq!(detect_time_column(&fallback).unwrap(), 0);

        let none = extract_table(&Source::text("n", "a,b\nx,1\n"), &TableOptions::default()).unwrap();
        assert!(matches!(
            detect_time_column(&none),
            Err(ResampleError::NoTimeColumn { .. })
        ));
    }

    #[test]
    fn first_aggregation_takes_first_present_value_per_bin() {
        let out = resample(&track(), Duration::hours(1), Aggregation::First).unwrap();

        // bins 00:00, 01:00, 03:00 (02:00 is empty)
        assert_eq!(out.len(), 3);
        assert_eq!(out.rows[0][0], Value::Text("2024-02-17T00:01:00.00Z".into()));
        assert_eq!(out.rows[0][1], Value::Number(-117.0));
        assert_eq!(out.rows[2][0], Value::Text("2024-02-17T03:10:00.00Z".into()));
    }

    #[test]
    fn first_skips_missing_cells() {
        let text = "\
iso_time,speed_made_good
2024-02-17T00:01:00Z,
2024-02-17T00:02:00Z,2.5
";
        let ds = extract_table(&Source::text("gap", text), &TableOptions::default()).unwrap();
        let out = resample(&ds, Duration::hours(1), Aggregation::First).unwrap();
        assert_eq!(out.rows[0][1], Value::Number(2.5));
    }

    #[test]
    fn mean_aggregation_averages_numbers_and_labels_bins() {
        let out = resample(&track(), Duration::hours(1), Aggregation::Mean).unwrap();

        assert_eq!(out.rows[0][0], Value::Text("2024-02-17T00:00:00Z".into()));
        assert_eq!(out.rows[0][1], Value::Number(-117.25));
        // missing speed is ignored, not counted as zero
        assert_eq!(out.rows[0][3], Value::Number(1.0));
        assert_eq!(out.rows[1][0], Value::Text("2024-02-17T01:00:00Z".into()));
    }

    #[test]
    fn unsorted_rows_and_bad_timestamps() {
        let text = "\
iso_time,v
2024-02-17T02:00:00Z,3
garbage,99
2024-02-17T00:10:00Z,1
";
        let ds = extract_table(&Source::text("u", text), &TableOptions::default()).unwrap();
        let out = resample(&ds, Duration::hours(1), Aggregation::First).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows[0][1], Value::Number(1.0));
        assert_eq!(out.rows[1][1], Value::Number(3.0));
    }
}
