use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;

use crate::domain::{CalendarFilter, TimeSeriesContext, TimeSeriesPoint};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// One row of the hourly input CSV
#[derive(Debug, Deserialize)]
struct InputRow {
    datetime: String,
    price_el: f64,
    price_gas: f64,
    demand_th: f64,
}

/// Parse an RFC 3339 timestamp, or a naive one taken as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .with_context(|| format!("unrecognised timestamp '{}'", raw))
}

/// Read `datetime,price_el,price_gas,demand_th` rows into a validated horizon.
///
/// Gaps, duplicates and unordered rows are rejected; nothing is filled in.
pub fn read_horizon<R: Read>(reader: R) -> Result<TimeSeriesContext> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut points = Vec::new();
    for (i, row) in reader.deserialize::<InputRow>().enumerate() {
        let row = row.with_context(|| format!("invalid input row {}", i + 1))?;
        let timestamp = parse_timestamp(&row.datetime).with_context(|| format!("invalid input row {}", i + 1))?;
        points.push(TimeSeriesPoint::new(timestamp, row.price_el, row.price_gas, row.demand_th));
    }
    Ok(TimeSeriesContext::new(points)?)
}

pub fn load_horizon(path: &Path) -> Result<TimeSeriesContext> {
    let file = File::open(path).with_context(|| format!("unable to open input csv {}", path.display()))?;
    let ctx = read_horizon(file).with_context(|| format!("invalid input csv {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        steps = ctx.len(),
        from = %ctx.first_timestamp(),
        to = %ctx.last_timestamp(),
        "input series loaded"
    );
    Ok(ctx)
}

/// Restrict a loaded horizon to the configured months, day and hour
pub fn apply_filters(ctx: &TimeSeriesContext, filter: &CalendarFilter) -> Result<TimeSeriesContext> {
    if filter.is_empty() {
        return Ok(ctx.clone());
    }
    let filtered = filter.apply(ctx)?;
    tracing::info!(
        months = ?filter.months,
        day = ?filter.day,
        hour = ?filter.hour,
        steps = filtered.len(),
        "calendar filter applied"
    );
    Ok(filtered)
}
