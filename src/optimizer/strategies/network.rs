//! Network dispatch model
//!
//! The plant as a carrier network: gas is bought from `Gas_Supply`, converted
//! by the `CHP` link into heat and electricity and by the `Boiler` link into heat,
//! electricity is sold through `Market_Sale` and heat leaves through `Heat_Load`.
//! After assembly one custom constraint ties the units together: CHP gas input
//! must be at least boiler gas input in every hour.

use good_lp::constraint;
use indexmap::IndexMap;

use crate::domain::{
    snap, snap_status, DispatchRecord, DispatchResult, FormulationKind, TimeSeriesContext, UnitParams,
};
use crate::error::DispatchError;
use crate::network::{AssembledModel, Bus, Generator, Link, Load, Network, NetworkSolution, VariableGroup};
use crate::optimizer::constraints::log_shortfall;
use crate::optimizer::DispatchFormulation;
use crate::solver::SolverSettings;

pub const CHP: &str = "CHP";
pub const BOILER: &str = "Boiler";
pub const GAS_SUPPLY: &str = "Gas_Supply";
pub const MARKET_SALE: &str = "Market_Sale";
pub const HEAT_LOAD: &str = "Heat_Load";

pub const GAS: &str = "gas";
pub const HEAT: &str = "heat";
pub const ELECTRICITY: &str = "electricity";

/// Name of the custom constraint group added after assembly
pub const CHP_GEQ_BOILER: &str = "CHP_gas_geq_Boiler_gas";

/// Formulation B
#[derive(Debug, Clone)]
pub struct NetworkDispatch {
    settings: SolverSettings,
    chp_geq_boiler: bool,
}

impl Default for NetworkDispatch {
    fn default() -> Self {
        Self::new(SolverSettings::default())
    }
}

impl NetworkDispatch {
    pub fn new(settings: SolverSettings) -> Self {
        Self {
            settings,
            chp_geq_boiler: true,
        }
    }

    /// Switch the CHP ≥ Boiler constraint on or off
    pub fn with_chp_geq_boiler(mut self, enabled: bool) -> Self {
        self.chp_geq_boiler = enabled;
        self
    }

    pub fn chp_geq_boiler(&self) -> bool {
        self.chp_geq_boiler
    }
}

/// Build the plant network for one horizon
pub fn build_network(ctx: &TimeSeriesContext, params: &UnitParams) -> Result<Network, DispatchError> {
    let chp = &params.chp;
    let boiler = &params.boiler;
    let sale_cost: Vec<f64> = ctx.price_electricity().into_iter().map(|p| -p).collect();

    Network::builder(ctx.timestamps())
        .carrier(GAS)
        .carrier(ELECTRICITY)
        .carrier(HEAT)
        .carrier("chp")
        .carrier("boiler")
        .bus(Bus::new(GAS).carrier(GAS))
        .bus(Bus::new(HEAT).carrier(HEAT))
        .bus(Bus::new(ELECTRICITY).carrier(ELECTRICITY))
        .generator(
            Generator::new(GAS_SUPPLY, GAS)
                .carrier(GAS)
                .extendable()
                .marginal_cost(ctx.gas_cost_total(&params.economics)),
        )
        .generator(
            Generator::new(MARKET_SALE, ELECTRICITY)
                .carrier(ELECTRICITY)
                .extendable()
                .sign(-1.0)
                .marginal_cost(sale_cost),
        )
        .link(
            Link::new(CHP, GAS, HEAT)
                .bus2(ELECTRICITY, chp.eta_el)
                .carrier("chp")
                .efficiency(chp.eta_th)
                .p_nom(chp.p_gas_max)
                .p_min_pu(chp.min_load_ratio())
                .marginal_cost(chp.marginal_cost)
                .committable(),
        )
        .link(
            Link::new(BOILER, GAS, HEAT)
                .carrier("boiler")
                .efficiency(boiler.eta_th)
                .p_nom(boiler.p_gas_max)
                .marginal_cost(boiler.marginal_cost),
        )
        .load(Load::new(HEAT_LOAD, HEAT, ctx.heat_demand()).carrier(HEAT))
        .build()
}

/// Per-step series of one component, zeros when the solver reported nothing
fn series(map: &IndexMap<String, Vec<f64>>, component: &str, attribute: &str, n: usize) -> Vec<f64> {
    match map.get(component) {
        Some(values) if values.len() == n => values.clone(),
        Some(values) => {
            tracing::warn!(
                component,
                attribute,
                found = values.len(),
                expected = n,
                "series length differs from horizon, padding with zeros"
            );
            let mut padded = values.clone();
            padded.resize(n, 0.0);
            padded
        }
        None => {
            tracing::warn!(component, attribute, "no series in solution, defaulting to zero");
            vec![0.0; n]
        }
    }
}

impl DispatchFormulation for NetworkDispatch {
    type Model = AssembledModel;
    type Solution = NetworkSolution;

    fn kind(&self) -> FormulationKind {
        FormulationKind::Network
    }

    fn build(&self, ctx: &TimeSeriesContext, params: &UnitParams) -> Result<AssembledModel, DispatchError> {
        params.validate()?;
        log_shortfall(ctx, params);

        let model = build_network(ctx, params)?.assemble()?;
        if !self.chp_geq_boiler {
            tracing::info!("CHP >= Boiler constraint disabled");
            return Ok(model);
        }

        let chp_gas = model.variables(VariableGroup::LinkP, CHP)?;
        let boiler_gas = model.variables(VariableGroup::LinkP, BOILER)?;
        let rows = chp_gas
            .iter()
            .zip(boiler_gas)
            .map(|(&c, &b)| constraint!(c >= b))
            .collect();
        model.add_constraints(CHP_GEQ_BOILER, rows)
    }

    fn solve(&self, model: AssembledModel) -> Result<NetworkSolution, DispatchError> {
        let solution = model.solve(&self.settings)?;
        tracing::info!(objective = solution.objective, "network dispatch cost");
        Ok(solution)
    }

    fn extract(&self, solution: &NetworkSolution, ctx: &TimeSeriesContext, _params: &UnitParams) -> DispatchResult {
        let n = ctx.len();
        let links = &solution.links_t;
        let chp_gas = series(&links.p0, CHP, "p0", n);
        let chp_heat = series(&links.p1, CHP, "p1", n);
        let chp_el = series(&links.p2, CHP, "p2", n);
        let chp_status = series(&links.status, CHP, "status", n);
        let boiler_gas = series(&links.p0, BOILER, "p0", n);
        let boiler_heat = series(&links.p1, BOILER, "p1", n);

        // outputs are negative on the link side
        let records = ctx
            .points()
            .iter()
            .enumerate()
            .map(|(t, point)| {
                let status = snap_status(chp_status[t]);
                let on = f64::from(status);
                DispatchRecord {
                    timestamp: point.timestamp,
                    chp_gas_in: on * snap(chp_gas[t]),
                    chp_el_out: on * snap(-chp_el[t]),
                    chp_heat_out: on * snap(-chp_heat[t]),
                    chp_status: status,
                    boiler_gas_in: snap(boiler_gas[t]),
                    boiler_heat_out: snap(-boiler_heat[t]),
                }
            })
            .collect();
        DispatchResult::new(FormulationKind::Network, records)
    }
}
