#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use chp_dispatch::domain::{BoilerSpec, ChpSpec, Economics, TimeSeriesContext, TimeSeriesPoint, UnitParams};

pub const GAS_PRICE: f64 = 30.0;

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

/// Plant from the reference scenario: 2.556 MWh CHP, 19.13 MWh boiler
pub fn plant() -> UnitParams {
    UnitParams::new(
        ChpSpec {
            p_gas_max: 2.556,
            p_gas_min: 1.0,
            eta_el: 0.42,
            eta_th: 0.458,
            marginal_cost: 5.0,
        },
        BoilerSpec {
            p_gas_max: 19.13,
            eta_th: 0.836,
            marginal_cost: 2.0,
        },
        Economics {
            co2_intensity_gas: 0.2,
            co2_price: 80.0,
        },
    )
    .unwrap()
}

pub fn horizon(prices_el: &[f64], demand: &[f64]) -> TimeSeriesContext {
    assert_eq!(prices_el.len(), demand.len());
    let points = prices_el
        .iter()
        .zip(demand)
        .enumerate()
        .map(|(i, (&p, &d))| TimeSeriesPoint::new(start() + Duration::hours(i as i64), p, GAS_PRICE, d))
        .collect();
    TimeSeriesContext::new(points).unwrap()
}

pub fn flat(price_el: f64, demand: &[f64]) -> TimeSeriesContext {
    horizon(&vec![price_el; demand.len()], demand)
}
