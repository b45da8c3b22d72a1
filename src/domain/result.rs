use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use super::TimeSeriesContext;

/// Magnitudes below this are solver noise and reported as exactly zero
pub const SNAP_EPSILON: f64 = 1e-9;

/// Slack when deciding whether CHP gas input fell below boiler gas input
const ORDERING_TOLERANCE: f64 = 1e-6;

/// Which formulation produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FormulationKind {
    /// Mixed-integer program written directly against the solver
    Direct,
    /// Carrier/network energy-system model
    Network,
}

/// Dispatch of both units in one hour, all values non-negative
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub timestamp: DateTime<Utc>,
    pub chp_gas_in: f64,
    pub chp_el_out: f64,
    pub chp_heat_out: f64,
    pub chp_status: u8,
    pub boiler_gas_in: f64,
    pub boiler_heat_out: f64,
}

impl DispatchRecord {
    pub fn heat_out(&self) -> f64 {
        self.chp_heat_out + self.boiler_heat_out
    }

    pub fn gas_in(&self) -> f64 {
        self.chp_gas_in + self.boiler_gas_in
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ChpGasIn => self.chp_gas_in,
            Metric::ChpHeatOut => self.chp_heat_out,
            Metric::ChpElOut => self.chp_el_out,
            Metric::BoilerGasIn => self.boiler_gas_in,
            Metric::BoilerHeatOut => self.boiler_heat_out,
        }
    }
}

/// Flow quantities both formulations report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ChpGasIn,
    ChpHeatOut,
    ChpElOut,
    BoilerGasIn,
    BoilerHeatOut,
}

/// The normalized outcome of one formulation over one horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub formulation: FormulationKind,
    pub records: Vec<DispatchRecord>,
}

impl DispatchResult {
    pub fn new(formulation: FormulationKind, records: Vec<DispatchRecord>) -> Self {
        Self {
            formulation,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.records.iter().map(|r| r.timestamp)
    }

    pub fn total(&self, metric: Metric) -> f64 {
        self.records.iter().map(|r| r.metric(metric)).sum()
    }

    /// Horizon totals for every shared metric, in `Metric` order
    pub fn totals(&self) -> Vec<(Metric, f64)> {
        Metric::iter().map(|m| (m, self.total(m))).collect()
    }

    /// Largest |heat produced - heat demanded| over the horizon
    pub fn max_heat_balance_residual(&self, ctx: &TimeSeriesContext) -> f64 {
        self.records
            .iter()
            .zip(ctx.points())
            .map(|(r, p)| (r.heat_out() - p.heat_demand).abs())
            .fold(0.0, f64::max)
    }

    /// Steps where the CHP burns less gas than the boiler
    pub fn chp_below_boiler_steps(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.chp_gas_in + ORDERING_TOLERANCE < r.boiler_gas_in)
            .count()
    }
}

/// Clean a solver value: tiny magnitudes become exactly zero
pub fn snap(value: f64) -> f64 {
    if value.abs() < SNAP_EPSILON {
        0.0
    } else {
        value
    }
}

/// Round a relaxed binary to 0/1
pub fn snap_status(value: f64) -> u8 {
    if value > 0.5 {
        1
    } else {
        0
    }
}
