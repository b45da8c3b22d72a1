use serde::Serialize;

use crate::domain::{DispatchResult, Metric, TimeSeriesContext, UnitParams};
use crate::error::DispatchError;

/// Key performance indicators of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Kpis {
    pub total_gas_mwh: f64,
    pub total_heat_mwh: f64,
    pub total_elec_mwh: f64,
    /// Share of hours with the CHP committed
    pub chp_utilization_pct: f64,
    /// Mean CHP gas input over the hours it runs
    pub avg_chp_load_mwh: f64,
    pub boiler_heat_share_pct: f64,
}

impl Kpis {
    /// Label/value pairs in display order
    pub fn rows(&self) -> [(&'static str, f64); 6] {
        [
            ("Total gas (MWh)", self.total_gas_mwh),
            ("Total heat (MWh)", self.total_heat_mwh),
            ("Total electricity (MWh)", self.total_elec_mwh),
            ("CHP utilization (%)", self.chp_utilization_pct),
            ("Avg CHP load when running (MWh)", self.avg_chp_load_mwh),
            ("Boiler heat share (%)", self.boiler_heat_share_pct),
        ]
    }
}

pub fn calculate_kpis(result: &DispatchResult) -> Kpis {
    let total_gas_mwh = result.total(Metric::ChpGasIn) + result.total(Metric::BoilerGasIn);
    let total_heat_mwh = result.total(Metric::ChpHeatOut) + result.total(Metric::BoilerHeatOut);
    let total_elec_mwh = result.total(Metric::ChpElOut);

    let hours = result.len().max(1) as f64;
    let committed: f64 = result.records.iter().map(|r| f64::from(r.chp_status)).sum();

    let running: Vec<f64> = result
        .records
        .iter()
        .map(|r| r.chp_gas_in)
        .filter(|&g| g > 0.0)
        .collect();
    let avg_chp_load_mwh = if running.is_empty() {
        0.0
    } else {
        running.iter().sum::<f64>() / running.len() as f64
    };

    let boiler_heat_share_pct = if total_heat_mwh > 0.0 {
        result.total(Metric::BoilerHeatOut) / total_heat_mwh * 100.0
    } else {
        0.0
    };

    Kpis {
        total_gas_mwh,
        total_heat_mwh,
        total_elec_mwh,
        chp_utilization_pct: committed / hours * 100.0,
        avg_chp_load_mwh,
        boiler_heat_share_pct,
    }
}

/// Realised money flows of a dispatch (EUR)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProfitBreakdown {
    pub electricity_revenue: f64,
    pub gas_cost: f64,
    pub co2_cost: f64,
    pub marginal_cost: f64,
    pub profit: f64,
}

/// Profit of a dispatch against its horizon's prices.
///
/// Equals the direct model's objective value at the optimum.
pub fn profit(
    result: &DispatchResult,
    ctx: &TimeSeriesContext,
    params: &UnitParams,
) -> Result<ProfitBreakdown, DispatchError> {
    if result.len() != ctx.len() {
        return Err(DispatchError::HorizonMismatch(format!(
            "result has {} steps, horizon has {}",
            result.len(),
            ctx.len()
        )));
    }

    let carbon = params.economics.carbon_cost_per_mwh_gas();
    let mut breakdown = ProfitBreakdown::default();
    for (r, p) in result.records.iter().zip(ctx.points()) {
        if r.timestamp != p.timestamp {
            return Err(DispatchError::HorizonMismatch(format!(
                "result step {} does not match horizon step {}",
                r.timestamp, p.timestamp
            )));
        }
        let gas = r.gas_in();
        breakdown.electricity_revenue += p.price_electricity * r.chp_el_out;
        breakdown.gas_cost += p.price_gas * gas;
        breakdown.co2_cost += carbon * gas;
        breakdown.marginal_cost +=
            params.chp.marginal_cost * r.chp_gas_in + params.boiler.marginal_cost * r.boiler_gas_in;
    }
    breakdown.profit = breakdown.electricity_revenue
        - breakdown.gas_cost
        - breakdown.co2_cost
        - breakdown.marginal_cost;
    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BoilerSpec, ChpSpec, DispatchRecord, Economics, FormulationKind, TimeSeriesPoint,
    };
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn hour(h: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn dispatch() -> DispatchResult {
        let rows = [(2.0, 1, 1.0), (0.0, 0, 2.5), (3.0, 1, 0.0), (0.0, 0, 0.0)];
        let records = rows
            .iter()
            .enumerate()
            .map(|(h, &(chp, status, boiler))| DispatchRecord {
                timestamp: hour(h as i64),
                chp_gas_in: chp,
                chp_el_out: 0.4 * chp,
                chp_heat_out: 0.5 * chp,
                chp_status: status,
                boiler_gas_in: boiler,
                boiler_heat_out: 0.8 * boiler,
            })
            .collect();
        DispatchResult::new(FormulationKind::Direct, records)
    }

    #[test]
    fn test_kpis() {
        let kpis = calculate_kpis(&dispatch());
        assert_relative_eq!(kpis.total_gas_mwh, 8.5, epsilon = 1e-9);
        assert_relative_eq!(kpis.total_heat_mwh, 2.5 + 2.8, epsilon = 1e-9);
        assert_relative_eq!(kpis.total_elec_mwh, 2.0, epsilon = 1e-9);
        assert_relative_eq!(kpis.chp_utilization_pct, 50.0, epsilon = 1e-9);
        assert_relative_eq!(kpis.avg_chp_load_mwh, 2.5, epsilon = 1e-9);
        assert_relative_eq!(kpis.boiler_heat_share_pct, 2.8 / 5.3 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_kpis_of_idle_dispatch() {
        let idle = DispatchResult::new(FormulationKind::Network, vec![]);
        let kpis = calculate_kpis(&idle);
        assert_eq!(kpis.avg_chp_load_mwh, 0.0);
        assert_eq!(kpis.boiler_heat_share_pct, 0.0);
    }

    #[test]
    fn test_profit_breakdown() {
        let params = UnitParams::new(
            ChpSpec {
                p_gas_max: 3.0,
                p_gas_min: 1.0,
                eta_el: 0.4,
                eta_th: 0.5,
                marginal_cost: 5.0,
            },
            BoilerSpec {
                p_gas_max: 5.0,
                eta_th: 0.8,
                marginal_cost: 2.0,
            },
            Economics {
                co2_intensity_gas: 0.2,
                co2_price: 50.0,
            },
        )
        .unwrap();
        let points = (0..4)
            .map(|h| TimeSeriesPoint::new(hour(h), 100.0, 30.0, 1.0))
            .collect();
        let ctx = TimeSeriesContext::new(points).unwrap();

        let b = profit(&dispatch(), &ctx, &params).unwrap();
        assert_relative_eq!(b.electricity_revenue, 200.0, epsilon = 1e-9);
        assert_relative_eq!(b.gas_cost, 255.0, epsilon = 1e-9);
        assert_relative_eq!(b.co2_cost, 85.0, epsilon = 1e-9);
        assert_relative_eq!(b.marginal_cost, 25.0 + 7.0, epsilon = 1e-9);
        assert_relative_eq!(b.profit, 200.0 - 255.0 - 85.0 - 32.0, epsilon = 1e-9);

        let short = ctx.select(|p| p.timestamp < hour(2)).unwrap();
        assert!(profit(&dispatch(), &short, &params).is_err());
    }
}
