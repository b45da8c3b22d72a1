use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::DispatchError;

/// Combined heat and power unit. All flows are per hour, gas-input based (MWh).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_chp_band"))]
pub struct ChpSpec {
    #[validate(range(exclusive_min = 0.0))]
    pub p_gas_max: f64,
    #[validate(range(min = 0.0))]
    pub p_gas_min: f64,
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub eta_el: f64,
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub eta_th: f64,
    /// Operating cost per MWh of gas input, excluding fuel (EUR/MWh)
    #[validate(range(min = 0.0))]
    pub marginal_cost: f64,
}

fn validate_chp_band(chp: &ChpSpec) -> Result<(), ValidationError> {
    if chp.p_gas_min > chp.p_gas_max {
        let mut err = ValidationError::new("chp_band");
        err.message = Some(
            format!(
                "p_gas_min ({}) must not exceed p_gas_max ({})",
                chp.p_gas_min, chp.p_gas_max
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

impl ChpSpec {
    /// Minimum load as a fraction of capacity
    pub fn min_load_ratio(&self) -> f64 {
        self.p_gas_min / self.p_gas_max
    }

    pub fn max_heat(&self) -> f64 {
        self.eta_th * self.p_gas_max
    }
}

/// Gas boiler. Always modulating between zero and capacity, never committed.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct BoilerSpec {
    #[validate(range(exclusive_min = 0.0))]
    pub p_gas_max: f64,
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub eta_th: f64,
    #[validate(range(min = 0.0))]
    pub marginal_cost: f64,
}

impl BoilerSpec {
    pub fn max_heat(&self) -> f64 {
        self.eta_th * self.p_gas_max
    }
}

/// Scenario-wide carbon terms
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate, PartialEq)]
pub struct Economics {
    /// Tonnes of CO2 per MWh of gas burned
    #[validate(range(min = 0.0))]
    pub co2_intensity_gas: f64,
    /// EUR per tonne of CO2
    #[validate(range(min = 0.0))]
    pub co2_price: f64,
}

impl Economics {
    pub fn carbon_cost_per_mwh_gas(&self) -> f64 {
        self.co2_price * self.co2_intensity_gas
    }
}

/// Fixed technical and economic parameters of the plant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitParams {
    pub chp: ChpSpec,
    pub boiler: BoilerSpec,
    pub economics: Economics,
}

impl UnitParams {
    pub fn new(chp: ChpSpec, boiler: BoilerSpec, economics: Economics) -> Result<Self, DispatchError> {
        let params = Self {
            chp,
            boiler,
            economics,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        self.chp.validate()?;
        self.boiler.validate()?;
        self.economics.validate()?;
        Ok(())
    }

    /// Largest heat output the plant can deliver in one hour
    pub fn max_heat(&self) -> f64 {
        self.chp.max_heat() + self.boiler.max_heat()
    }
}
