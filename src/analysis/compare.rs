use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::domain::{DispatchResult, FormulationKind, Metric, SNAP_EPSILON};
use crate::error::DispatchError;

/// Relative tolerance on horizon totals (1 %)
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Horizon totals of one metric in both results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub metric: Metric,
    pub reference_total: f64,
    pub candidate_total: f64,
    pub difference: f64,
    /// Relative to the reference total; infinite when only the candidate is non-zero
    pub difference_pct: f64,
    pub matches: bool,
}

/// Per-step `candidate - reference` for every metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepDifference {
    pub timestamp: DateTime<Utc>,
    pub chp_gas_in: f64,
    pub chp_heat_out: f64,
    pub chp_el_out: f64,
    pub boiler_gas_in: f64,
    pub boiler_heat_out: f64,
}

impl StepDifference {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ChpGasIn => self.chp_gas_in,
            Metric::ChpHeatOut => self.chp_heat_out,
            Metric::ChpElOut => self.chp_el_out,
            Metric::BoilerGasIn => self.boiler_gas_in,
            Metric::BoilerHeatOut => self.boiler_heat_out,
        }
    }
}

/// How far apart the two results are, and whether that is expected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Divergence {
    /// Every metric within tolerance
    Agreement,
    /// Totals differ, and the reference optimum runs the CHP below the boiler in
    /// `steps` hours, which the network model forbids
    ExplainedByChpBoilerOrdering { steps: usize },
    /// Totals differ without a known cause
    Unexplained,
}

impl Divergence {
    pub fn is_unexplained(&self) -> bool {
        matches!(self, Divergence::Unexplained)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub reference: FormulationKind,
    pub candidate: FormulationKind,
    pub tolerance: f64,
    pub metrics: Vec<MetricComparison>,
    pub steps: Vec<StepDifference>,
    pub divergence: Divergence,
}

impl ComparisonReport {
    pub fn all_match(&self) -> bool {
        self.metrics.iter().all(|m| m.matches)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &MetricComparison> {
        self.metrics.iter().filter(|m| !m.matches)
    }

    pub fn metric(&self, metric: Metric) -> Option<&MetricComparison> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

/// Checks that two formulations agree on horizon totals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparator {
    tolerance: f64,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Comparator {
    pub fn new(tolerance: f64) -> Result<Self, DispatchError> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(DispatchError::Configuration(format!(
                "comparison tolerance must be positive, got {}",
                tolerance
            )));
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Compare `candidate` against `reference`.
    ///
    /// Percentages are relative to the reference, normally the direct model,
    /// whose optimum is also where a CHP-below-boiler hour can explain a gap.
    pub fn compare(
        &self,
        reference: &DispatchResult,
        candidate: &DispatchResult,
    ) -> Result<ComparisonReport, DispatchError> {
        check_alignment(reference, candidate)?;

        let metrics: Vec<MetricComparison> = Metric::iter()
            .map(|metric| {
                let reference_total = reference.total(metric);
                let candidate_total = candidate.total(metric);
                let difference = (reference_total - candidate_total).abs();
                let difference_pct = percentage(difference, reference_total, candidate_total);
                MetricComparison {
                    metric,
                    reference_total,
                    candidate_total,
                    difference,
                    difference_pct,
                    matches: difference_pct < self.tolerance * 100.0,
                }
            })
            .collect();

        let steps = reference
            .records
            .iter()
            .zip(&candidate.records)
            .map(|(r, c)| StepDifference {
                timestamp: r.timestamp,
                chp_gas_in: c.chp_gas_in - r.chp_gas_in,
                chp_heat_out: c.chp_heat_out - r.chp_heat_out,
                chp_el_out: c.chp_el_out - r.chp_el_out,
                boiler_gas_in: c.boiler_gas_in - r.boiler_gas_in,
                boiler_heat_out: c.boiler_heat_out - r.boiler_heat_out,
            })
            .collect();

        let divergence = if metrics.iter().all(|m| m.matches) {
            Divergence::Agreement
        } else {
            match reference.chp_below_boiler_steps() {
                0 => Divergence::Unexplained,
                steps => Divergence::ExplainedByChpBoilerOrdering { steps },
            }
        };

        match divergence {
            Divergence::Agreement => tracing::info!(tolerance = self.tolerance, "formulations agree"),
            Divergence::ExplainedByChpBoilerOrdering { steps } => tracing::info!(
                steps,
                "formulations diverge where the direct optimum runs the CHP below the boiler"
            ),
            Divergence::Unexplained => tracing::warn!(
                mismatched = metrics.iter().filter(|m| !m.matches).count(),
                "formulations diverge without a known cause"
            ),
        }

        Ok(ComparisonReport {
            reference: reference.formulation,
            candidate: candidate.formulation,
            tolerance: self.tolerance,
            metrics,
            steps,
            divergence,
        })
    }
}

fn percentage(difference: f64, reference_total: f64, candidate_total: f64) -> f64 {
    if reference_total.abs() > SNAP_EPSILON {
        difference / reference_total.abs() * 100.0
    } else if candidate_total.abs() > SNAP_EPSILON {
        f64::INFINITY
    } else {
        0.0
    }
}

fn check_alignment(reference: &DispatchResult, candidate: &DispatchResult) -> Result<(), DispatchError> {
    if reference.len() != candidate.len() {
        return Err(DispatchError::HorizonMismatch(format!(
            "{} has {} steps, {} has {}",
            reference.formulation,
            reference.len(),
            candidate.formulation,
            candidate.len()
        )));
    }
    if let Some((a, b)) = reference
        .timestamps()
        .zip(candidate.timestamps())
        .find(|(a, b)| a != b)
    {
        return Err(DispatchError::HorizonMismatch(format!(
            "timestamps differ: {} vs {}",
            a, b
        )));
    }
    Ok(())
}
