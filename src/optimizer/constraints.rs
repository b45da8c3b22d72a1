use serde::Serialize;

use crate::domain::{TimeSeriesContext, UnitParams};

/// Steps whose heat demand exceeds what both units can deliver together
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapacityShortfall {
    pub max_heat: f64,
    pub steps: Vec<usize>,
    pub worst_deficit: f64,
}

impl CapacityShortfall {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Diagnose under-capacity before solving.
///
/// The models keep heat balance as an equality, so any step listed here makes the
/// whole horizon infeasible. The check only informs logs; it never alters a model.
pub fn capacity_shortfall(ctx: &TimeSeriesContext, params: &UnitParams) -> CapacityShortfall {
    let max_heat = params.max_heat();
    let mut shortfall = CapacityShortfall {
        max_heat,
        ..Default::default()
    };
    for (t, point) in ctx.points().iter().enumerate() {
        let deficit = point.heat_demand - max_heat;
        if deficit > 0.0 {
            shortfall.steps.push(t);
            shortfall.worst_deficit = shortfall.worst_deficit.max(deficit);
        }
    }
    shortfall
}

pub(crate) fn log_shortfall(ctx: &TimeSeriesContext, params: &UnitParams) {
    let shortfall = capacity_shortfall(ctx, params);
    if !shortfall.is_empty() {
        tracing::warn!(
            steps = shortfall.steps.len(),
            first_step = shortfall.steps[0],
            max_heat = shortfall.max_heat,
            worst_deficit = shortfall.worst_deficit,
            "heat demand exceeds installed thermal capacity; the horizon will be infeasible"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoilerSpec, ChpSpec, Economics, TimeSeriesPoint};
    use chrono::{Duration, TimeZone, Utc};

    fn params() -> UnitParams {
        UnitParams::new(
            ChpSpec {
                p_gas_max: 2.0,
                p_gas_min: 1.0,
                eta_el: 0.4,
                eta_th: 0.5,
                marginal_cost: 0.0,
            },
            BoilerSpec {
                p_gas_max: 5.0,
                eta_th: 0.8,
                marginal_cost: 0.0,
            },
            Economics {
                co2_intensity_gas: 0.0,
                co2_price: 0.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_shortfall_detection() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let demand = [1.0, 5.0, 6.5, 3.0];
        let points = demand
            .iter()
            .enumerate()
            .map(|(i, &d)| TimeSeriesPoint::new(start + Duration::hours(i as i64), 50.0, 30.0, d))
            .collect();
        let ctx = TimeSeriesContext::new(points).unwrap();

        let shortfall = capacity_shortfall(&ctx, &params());
        assert!((shortfall.max_heat - 5.0).abs() < 1e-12);
        assert_eq!(shortfall.steps, vec![2]);
        assert!((shortfall.worst_deficit - 1.5).abs() < 1e-12);
    }
}
