use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::{ComparisonReport, Divergence, Kpis, MetricComparison, ProfileRow, ProfitBreakdown};
use crate::domain::{DispatchResult, FormulationKind, TimeSeriesContext};

pub const COMPARISON_FILE: &str = "model_comparison.csv";
pub const STEP_DIFFERENCES_FILE: &str = "step_differences.csv";
pub const NETWORK_MODEL_FILE: &str = "network_model.txt";
pub const SUMMARY_FILE: &str = "summary.json";

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Serialize)]
struct ResultRow {
    datetime: String,
    chp_gas_in: f64,
    chp_el_out: f64,
    chp_heat_out: f64,
    chp_status: u8,
    boiler_gas_in: f64,
    boiler_heat_out: f64,
    heat_demand: f64,
    electricity_price: f64,
    gas_price: f64,
}

#[derive(Debug, Serialize)]
struct StepRow {
    datetime: String,
    chp_gas_in: f64,
    chp_heat_out: f64,
    chp_el_out: f64,
    boiler_gas_in: f64,
    boiler_heat_out: f64,
}

fn timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Dispatch joined with the demand and prices it was solved against
pub fn write_results<W: Write>(writer: W, result: &DispatchResult, ctx: &TimeSeriesContext) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for (r, p) in result.records.iter().zip(ctx.points()) {
        writer.serialize(ResultRow {
            datetime: timestamp(&r.timestamp),
            chp_gas_in: round3(r.chp_gas_in),
            chp_el_out: round3(r.chp_el_out),
            chp_heat_out: round3(r.chp_heat_out),
            chp_status: r.chp_status,
            boiler_gas_in: round3(r.boiler_gas_in),
            boiler_heat_out: round3(r.boiler_heat_out),
            heat_demand: round3(p.heat_demand),
            electricity_price: round3(p.price_electricity),
            gas_price: round3(p.price_gas),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Per-metric totals, one row per metric
pub fn write_comparison<W: Write>(writer: W, report: &ComparisonReport) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        "metric".to_string(),
        format!("{}_total", report.reference),
        format!("{}_total", report.candidate),
        "difference".to_string(),
        "difference_pct".to_string(),
        "match".to_string(),
    ])?;
    for m in &report.metrics {
        writer.write_record([
            m.metric.to_string(),
            round3(m.reference_total).to_string(),
            round3(m.candidate_total).to_string(),
            round3(m.difference).to_string(),
            round3(m.difference_pct).to_string(),
            m.matches.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// `candidate - reference` for every hour
pub fn write_step_differences<W: Write>(writer: W, report: &ComparisonReport) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for s in &report.steps {
        writer.serialize(StepRow {
            datetime: timestamp(&s.timestamp),
            chp_gas_in: round3(s.chp_gas_in),
            chp_heat_out: round3(s.chp_heat_out),
            chp_el_out: round3(s.chp_el_out),
            boiler_gas_in: round3(s.boiler_gas_in),
            boiler_heat_out: round3(s.boiler_heat_out),
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn create(dir: &Path, name: &str) -> Result<(File, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("unable to create output directory {}", dir.display()))?;
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("unable to create {}", path.display()))?;
    Ok((file, path))
}

/// Write `<formulation>_results.csv` into `dir`
pub fn export_results(dir: &Path, result: &DispatchResult, ctx: &TimeSeriesContext) -> Result<PathBuf> {
    let (file, path) = create(dir, &format!("{}_results.csv", result.formulation))?;
    write_results(file, result, ctx).with_context(|| format!("unable to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "results saved");
    Ok(path)
}

/// Write the comparison and the per-step difference tables into `dir`
pub fn export_comparison(dir: &Path, report: &ComparisonReport) -> Result<Vec<PathBuf>> {
    let (file, comparison) = create(dir, COMPARISON_FILE)?;
    write_comparison(file, report).with_context(|| format!("unable to write {}", comparison.display()))?;

    let (file, steps) = create(dir, STEP_DIFFERENCES_FILE)?;
    write_step_differences(file, report).with_context(|| format!("unable to write {}", steps.display()))?;

    tracing::info!(dir = %dir.display(), "comparison saved");
    Ok(vec![comparison, steps])
}

pub fn export_model_summary(dir: &Path, summary: &str) -> Result<PathBuf> {
    let (mut file, path) = create(dir, NETWORK_MODEL_FILE)?;
    file.write_all(summary.as_bytes())
        .with_context(|| format!("unable to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "network model saved");
    Ok(path)
}

#[derive(Debug, Serialize)]
pub struct FormulationSummary {
    pub formulation: FormulationKind,
    pub kpis: Kpis,
    pub profit: ProfitBreakdown,
    /// Mean per hour of day
    pub hourly: Vec<ProfileRow<u32>>,
    /// Sum per (year, month)
    pub monthly: Vec<ProfileRow<(i32, u32)>>,
}

#[derive(Debug, Serialize)]
pub struct ComparisonSummary<'a> {
    pub tolerance: f64,
    pub metrics: &'a [MetricComparison],
    pub divergence: Divergence,
}

/// Headline numbers of one run
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub steps: usize,
    pub formulations: Vec<FormulationSummary>,
    pub failures: Vec<(FormulationKind, String)>,
    pub comparison: Option<ComparisonSummary<'a>>,
}

impl<'a> From<&'a ComparisonReport> for ComparisonSummary<'a> {
    fn from(report: &'a ComparisonReport) -> Self {
        Self {
            tolerance: report.tolerance,
            metrics: &report.metrics,
            divergence: report.divergence,
        }
    }
}

pub fn export_summary(dir: &Path, summary: &RunSummary<'_>) -> Result<PathBuf> {
    let (file, path) = create(dir, SUMMARY_FILE)?;
    serde_json::to_writer_pretty(file, summary).with_context(|| format!("unable to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "summary saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Comparator;
    use crate::domain::{DispatchRecord, FormulationKind, TimeSeriesPoint};
    use chrono::{Duration, TimeZone, Utc};

    fn fixture() -> (TimeSeriesContext, DispatchResult) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ctx = TimeSeriesContext::new(vec![
            TimeSeriesPoint::new(start, 80.0, 35.0, 2.0),
            TimeSeriesPoint::new(start + Duration::hours(1), 90.0, 35.0, 1.0),
        ])
        .unwrap();
        let records = ctx
            .points()
            .iter()
            .map(|p| DispatchRecord {
                timestamp: p.timestamp,
                chp_gas_in: 2.0,
                chp_el_out: 0.84,
                chp_heat_out: 0.916,
                chp_status: 1,
                boiler_gas_in: (p.heat_demand - 0.916) / 0.836,
                boiler_heat_out: p.heat_demand - 0.916,
            })
            .collect();
        (ctx, DispatchResult::new(FormulationKind::Direct, records))
    }

    #[test]
    fn test_results_csv_is_rounded_and_joined() {
        let (ctx, result) = fixture();
        let mut buf = Vec::new();
        write_results(&mut buf, &result, &ctx).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "datetime,chp_gas_in,chp_el_out,chp_heat_out,chp_status,boiler_gas_in,boiler_heat_out,heat_demand,electricity_price,gas_price"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-01 00:00:00,2.0,0.84,0.916,1,1.297,1.084,2.0,80.0,35.0"
        );
    }

    #[test]
    fn test_export_comparison_writes_both_tables() {
        let (_, direct) = fixture();
        let mut network = direct.clone();
        network.formulation = FormulationKind::Network;
        let report = Comparator::default().compare(&direct, &network).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let paths = export_comparison(dir.path(), &report).unwrap();
        assert_eq!(paths.len(), 2);

        let comparison = fs::read_to_string(&paths[0]).unwrap();
        assert!(comparison.starts_with("metric,direct_total,network_total,difference,difference_pct,match"));
        assert!(comparison.contains("chp_gas_in,4,4,0,0,true"));

        let steps = fs::read_to_string(&paths[1]).unwrap();
        assert_eq!(steps.lines().count(), 3);

        let summary = RunSummary {
            steps: 2,
            formulations: vec![],
            failures: vec![(FormulationKind::Network, "infeasible".to_string())],
            comparison: Some((&report).into()),
        };
        let path = export_summary(dir.path(), &summary).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["comparison"]["divergence"]["kind"], "agreement");
        assert_eq!(json["failures"][0][0], "network");
    }
}
