//! Direct dispatch model
//!
//! Mixed-integer program written straight against the solver interface:
//!
//! - `chp_gas_in[t] ∈ [0, p_gas_max_chp]`, binary `chp_status[t]`
//! - `boiler_gas_in[t] ∈ [0, p_gas_max_boiler]`
//! - commitment: `p_gas_min·status ≤ chp_gas_in ≤ p_gas_max·status`
//! - heat balance: `eta_th_chp·chp_gas_in + eta_th_boiler·boiler_gas_in = demand`
//!
//! The objective maximises profit: electricity revenue minus gas, carbon and
//! marginal operating costs. Heat balance is an equality, so a step whose demand
//! exceeds installed thermal capacity makes the horizon infeasible.

use good_lp::{constraint, variable, Expression, ProblemVariables, Variable};

use crate::domain::{
    snap, snap_status, DispatchRecord, DispatchResult, FormulationKind, TimeSeriesContext, UnitParams,
};
use crate::error::DispatchError;
use crate::optimizer::constraints::log_shortfall;
use crate::optimizer::DispatchFormulation;
use crate::solver::{LinearProblem, Sense, SolverSettings};

/// Formulation A
#[derive(Debug, Clone, Default)]
pub struct DirectDispatch {
    settings: SolverSettings,
}

/// The built program plus the variables needed to read it back
pub struct DirectModel {
    problem: LinearProblem,
    chp_gas: Vec<Variable>,
    chp_status: Vec<Variable>,
    boiler_gas: Vec<Variable>,
}

impl DirectModel {
    pub fn num_constraints(&self) -> usize {
        self.problem.num_constraints()
    }
}

/// Raw per-step values at the optimum
#[derive(Debug, Clone, PartialEq)]
pub struct DirectSolution {
    pub objective: f64,
    pub chp_gas: Vec<f64>,
    pub chp_status: Vec<f64>,
    pub boiler_gas: Vec<f64>,
}

impl DirectDispatch {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }
}

impl DispatchFormulation for DirectDispatch {
    type Model = DirectModel;
    type Solution = DirectSolution;

    fn kind(&self) -> FormulationKind {
        FormulationKind::Direct
    }

    fn build(&self, ctx: &TimeSeriesContext, params: &UnitParams) -> Result<DirectModel, DispatchError> {
        params.validate()?;
        log_shortfall(ctx, params);

        let n = ctx.len();
        let chp = &params.chp;
        let boiler = &params.boiler;

        let mut vars = ProblemVariables::new();
        let chp_gas = vars.add_vector(variable().min(0.0).max(chp.p_gas_max), n);
        let chp_status = vars.add_vector(variable().binary(), n);
        let boiler_gas = vars.add_vector(variable().min(0.0).max(boiler.p_gas_max), n);

        let gas_cost = ctx.gas_cost_total(&params.economics);
        let mut objective = Expression::from(0.0);
        for (t, point) in ctx.points().iter().enumerate() {
            let chp_coeff = point.price_electricity * chp.eta_el - gas_cost[t] - chp.marginal_cost;
            let boiler_coeff = gas_cost[t] + boiler.marginal_cost;
            if chp_coeff > 0.0 {
                tracing::debug!(step = t, chp_coeff, "CHP profitable on electricity alone");
            }
            objective += chp_coeff * chp_gas[t] - boiler_coeff * boiler_gas[t];
        }

        let mut problem = LinearProblem::new(vars, objective, Sense::Maximise);
        for (t, point) in ctx.points().iter().enumerate() {
            problem
                .constraints
                .push(constraint!(chp_gas[t] <= chp.p_gas_max * chp_status[t]));
            problem
                .constraints
                .push(constraint!(chp_gas[t] >= chp.p_gas_min * chp_status[t]));
            problem.constraints.push(constraint!(
                chp.eta_th * chp_gas[t] + boiler.eta_th * boiler_gas[t] == point.heat_demand
            ));
        }

        tracing::debug!(
            steps = n,
            constraints = problem.num_constraints(),
            "direct model built"
        );

        Ok(DirectModel {
            problem,
            chp_gas,
            chp_status,
            boiler_gas,
        })
    }

    fn solve(&self, model: DirectModel) -> Result<DirectSolution, DispatchError> {
        let DirectModel {
            problem,
            chp_gas,
            chp_status,
            boiler_gas,
        } = model;
        let n = chp_gas.len();

        let readout: Vec<Variable> = chp_gas
            .iter()
            .chain(&chp_status)
            .chain(&boiler_gas)
            .copied()
            .collect();
        let outcome = problem.solve(&self.settings, n, &readout)?;

        let mut chunks = outcome.values.chunks_exact(n.max(1)).map(<[f64]>::to_vec);
        let mut next = || chunks.next().unwrap_or_default();
        Ok(DirectSolution {
            objective: outcome.objective,
            chp_gas: next(),
            chp_status: next(),
            boiler_gas: next(),
        })
    }

    fn extract(&self, solution: &DirectSolution, ctx: &TimeSeriesContext, params: &UnitParams) -> DispatchResult {
        let records = ctx
            .points()
            .iter()
            .enumerate()
            .map(|(t, point)| {
                let status = snap_status(solution.chp_status.get(t).copied().unwrap_or(0.0));
                // an uncommitted unit burns nothing, whatever the solver's float noise
                let chp_gas = if status == 0 {
                    0.0
                } else {
                    snap(solution.chp_gas.get(t).copied().unwrap_or(0.0))
                };
                let boiler_gas = snap(solution.boiler_gas.get(t).copied().unwrap_or(0.0));
                DispatchRecord {
                    timestamp: point.timestamp,
                    chp_gas_in: chp_gas,
                    chp_el_out: chp_gas * params.chp.eta_el,
                    chp_heat_out: chp_gas * params.chp.eta_th,
                    chp_status: status,
                    boiler_gas_in: boiler_gas,
                    boiler_heat_out: boiler_gas * params.boiler.eta_th,
                }
            })
            .collect();
        tracing::info!(objective = solution.objective, "direct dispatch profit");
        DispatchResult::new(FormulationKind::Direct, records)
    }
}
