//! Solver boundary
//!
//! Both formulations hand a fully built [`LinearProblem`] to this module. It picks
//! the `good_lp` backend named in the configuration, runs the blocking solve and
//! maps the backend outcome onto [`DispatchError`].
//!
//! Available backends depend on cargo features:
//! - `microlp` (default): pure Rust, supports binary variables, fine for days to weeks
//! - `highs`: HiGHS, recommended for year-long horizons, honours time limits
//! - `cbc`: COIN-OR CBC, needs the system library

use good_lp::solvers::SolutionStatus;
use good_lp::{Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::DispatchError;

/// Horizon length above which the pure-Rust backend gets slow on binaries
const MICROLP_COMFORTABLE_STEPS: usize = 24 * 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    Microlp,
    Highs,
    Cbc,
}

impl SolverKind {
    /// Whether this backend was compiled into the binary
    pub fn is_available(&self) -> bool {
        match self {
            SolverKind::Microlp => cfg!(feature = "microlp"),
            SolverKind::Highs => cfg!(feature = "highs"),
            SolverKind::Cbc => cfg!(feature = "cbc"),
        }
    }

    pub fn available() -> Vec<SolverKind> {
        SolverKind::iter().filter(|k| k.is_available()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub kind: SolverKind,
    pub time_limit_seconds: Option<f64>,
}

impl SolverSettings {
    /// Resolve a solver by its configured name.
    ///
    /// Unknown names and backends not compiled into this build are configuration
    /// errors; there is no fallback to another solver.
    pub fn from_name(name: &str, time_limit_seconds: Option<f64>) -> Result<Self, DispatchError> {
        let kind: SolverKind = name.trim().parse().map_err(|_| {
            DispatchError::Configuration(format!(
                "unknown solver '{}', expected one of: {}",
                name,
                SolverKind::iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
            ))
        })?;

        if !kind.is_available() {
            return Err(DispatchError::Configuration(format!(
                "solver '{}' is not available in this build (enable the '{}' feature); available: {:?}",
                kind,
                kind,
                SolverKind::available()
            )));
        }

        if let Some(limit) = time_limit_seconds {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(DispatchError::Configuration(format!(
                    "time_limit_seconds must be positive, got {}",
                    limit
                )));
            }
        }

        Ok(Self {
            kind,
            time_limit_seconds,
        })
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        let kind = SolverKind::available()
            .into_iter()
            .next()
            .unwrap_or(SolverKind::Microlp);
        Self {
            kind,
            time_limit_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Maximise,
    Minimise,
}

/// A linear program that is complete and will not be modified any more
pub struct LinearProblem {
    pub variables: ProblemVariables,
    pub objective: Expression,
    pub sense: Sense,
    pub constraints: Vec<Constraint>,
}

/// Values of the requested variables at the optimum
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub values: Vec<f64>,
    pub objective: f64,
}

impl LinearProblem {
    pub fn new(variables: ProblemVariables, objective: Expression, sense: Sense) -> Self {
        Self {
            variables,
            objective,
            sense,
            constraints: Vec::new(),
        }
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Solve and read back `readout` in the given order.
    ///
    /// Blocks until the backend returns.
    pub fn solve(
        self,
        settings: &SolverSettings,
        horizon_len: usize,
        readout: &[Variable],
    ) -> Result<SolveOutcome, DispatchError> {
        if settings.kind == SolverKind::Microlp && horizon_len > MICROLP_COMFORTABLE_STEPS {
            tracing::warn!(
                steps = horizon_len,
                "microlp received a long horizon; consider the 'highs' backend for faster solves"
            );
        }

        let objective = self.objective.clone();
        match settings.kind {
            #[cfg(feature = "microlp")]
            SolverKind::Microlp => {
                let model = self.into_model(good_lp::solvers::microlp::microlp);
                read_solution(model.solve(), &objective, readout)
            }
            #[cfg(feature = "highs")]
            SolverKind::Highs => {
                let mut model = self.into_model(good_lp::solvers::highs::highs);
                if let Some(limit) = settings.time_limit_seconds {
                    model = model.set_time_limit(limit);
                }
                read_solution(model.solve(), &objective, readout)
            }
            #[cfg(feature = "cbc")]
            SolverKind::Cbc => {
                let mut model = self.into_model(good_lp::solvers::coin_cbc::coin_cbc);
                if let Some(limit) = settings.time_limit_seconds {
                    model.set_parameter("sec", &limit.to_string());
                }
                read_solution(model.solve(), &objective, readout)
            }
            #[allow(unreachable_patterns)]
            other => Err(DispatchError::Configuration(format!(
                "solver '{}' is not available in this build",
                other
            ))),
        }
    }

    #[allow(dead_code)]
    fn into_model<S: good_lp::Solver>(self, solver: S) -> S::Model {
        let unsolved = match self.sense {
            Sense::Maximise => self.variables.maximise(self.objective),
            Sense::Minimise => self.variables.minimise(self.objective),
        };
        self.constraints
            .into_iter()
            .fold(unsolved.using(solver), |model, c| model.with(c))
    }
}

#[allow(dead_code)]
fn read_solution<S: Solution>(
    outcome: Result<S, ResolutionError>,
    objective: &Expression,
    readout: &[Variable],
) -> Result<SolveOutcome, DispatchError> {
    let solution = match outcome {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            return Err(DispatchError::Infeasible(
                "no dispatch satisfies all constraints over the horizon".to_string(),
            ))
        }
        Err(ResolutionError::Unbounded) => {
            return Err(DispatchError::SolverNonOptimal(
                "problem is unbounded".to_string(),
            ))
        }
        Err(other) => return Err(DispatchError::SolverNonOptimal(other.to_string())),
    };

    match solution.status() {
        SolutionStatus::Optimal => {}
        status => {
            return Err(DispatchError::SolverNonOptimal(format!(
                "solver stopped with status {:?}",
                status
            )))
        }
    }

    Ok(SolveOutcome {
        values: readout.iter().map(|&v| solution.value(v)).collect(),
        objective: solution.eval(objective.clone()),
    })
}
