use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::analysis::{Comparator, DEFAULT_TOLERANCE};
use crate::domain::{BoilerSpec, CalendarFilter, ChpSpec, Economics, UnitParams};
use crate::error::DispatchError;
use crate::solver::SolverSettings;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "CHP__";

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub chp: ChpSpec,
    #[validate(nested)]
    pub boiler: BoilerSpec,
    #[validate(nested)]
    pub economics: EconomicsConfig,
    #[validate(nested)]
    pub data: DataConfig,
    #[serde(default)]
    #[validate(nested)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct EconomicsConfig {
    /// t CO2 per MWh of gas
    #[validate(range(min = 0.0))]
    pub co2_intensity_gas: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct DataConfig {
    /// EUR per t CO2
    #[validate(range(min = 0.0))]
    pub co2_price: f64,
    /// Hourly series CSV
    pub input: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_months"))]
pub struct SettingsConfig {
    #[serde(default = "default_solver")]
    pub solver: String,
    #[validate(range(exclusive_min = 0.0))]
    pub time_limit_seconds: Option<f64>,
    #[serde(default = "default_tolerance")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub comparison_tolerance: f64,
    /// A single month or a list of months
    #[serde(default, deserialize_with = "one_or_many")]
    pub month: Vec<u32>,
    #[validate(range(min = 1, max = 31))]
    pub day: Option<u32>,
    #[validate(range(min = 0, max = 23))]
    pub hour: Option<u32>,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default = "default_true")]
    pub chp_geq_boiler: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            solver: default_solver(),
            time_limit_seconds: None,
            comparison_tolerance: DEFAULT_TOLERANCE,
            month: Vec::new(),
            day: None,
            hour: None,
            parallel: true,
            chp_geq_boiler: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub export_model: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            export_model: false,
        }
    }
}

fn default_solver() -> String {
    "microlp".to_string()
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(u32),
        Many(Vec<u32>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(month) => vec![month],
        OneOrMany::Many(months) => months,
    })
}

fn validate_months(settings: &SettingsConfig) -> Result<(), ValidationError> {
    if let Some(month) = settings.month.iter().find(|m| !(1..=12).contains(*m)) {
        let mut err = ValidationError::new("month");
        err.message = Some(format!("month {} is outside 1..=12", month).into());
        return Err(err);
    }
    Ok(())
}

impl Config {
    /// Load from a TOML file (default `config/default.toml`), then `CHP__*`
    /// environment overrides, e.g. `CHP__SETTINGS__SOLVER=highs`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let config: Self = figment
            .extract()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        config.check()?;
        tracing::debug!(path = %path.display(), solver = %config.settings.solver, "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = Figment::from(Toml::string(toml)).extract()?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), DispatchError> {
        self.validate()?;
        Ok(())
    }

    pub fn unit_params(&self) -> Result<UnitParams, DispatchError> {
        UnitParams::new(
            self.chp.clone(),
            self.boiler.clone(),
            Economics {
                co2_intensity_gas: self.economics.co2_intensity_gas,
                co2_price: self.data.co2_price,
            },
        )
    }

    pub fn solver_settings(&self) -> Result<SolverSettings, DispatchError> {
        SolverSettings::from_name(&self.settings.solver, self.settings.time_limit_seconds)
    }

    pub fn comparator(&self) -> Result<Comparator, DispatchError> {
        Comparator::new(self.settings.comparison_tolerance)
    }

    pub fn calendar_filter(&self) -> CalendarFilter {
        CalendarFilter {
            months: self.settings.month.clone(),
            day: self.settings.day,
            hour: self.settings.hour,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
        [chp]
        p_gas_max = 2.556
        p_gas_min = 1.278
        eta_el = 0.42
        eta_th = 0.458
        marginal_cost = 5.0

        [boiler]
        p_gas_max = 19.13
        eta_th = 0.836
        marginal_cost = 2.0

        [economics]
        co2_intensity_gas = 0.201

        [data]
        co2_price = 80.0
    "#;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str(BASE).unwrap();
        assert_eq!(config.settings.solver, "microlp");
        assert_eq!(config.settings.comparison_tolerance, DEFAULT_TOLERANCE);
        assert!(config.settings.parallel);
        assert!(config.settings.chp_geq_boiler);
        assert!(config.calendar_filter().is_empty());
        assert_eq!(config.output.dir, PathBuf::from("results"));

        let params = config.unit_params().unwrap();
        assert!((params.economics.carbon_cost_per_mwh_gas() - 16.08).abs() < 1e-9);
    }

    #[test]
    fn test_month_accepts_scalar_and_list() {
        let single = Config::from_toml_str(&format!("{}\n[settings]\nmonth = 3\n", BASE)).unwrap();
        assert_eq!(single.settings.month, vec![3]);

        let many = Config::from_toml_str(&format!("{}\n[settings]\nmonth = [1, 2]\nhour = 12\n", BASE)).unwrap();
        let filter = many.calendar_filter();
        assert_eq!(filter.months, vec![1, 2]);
        assert_eq!(filter.hour, Some(12));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(Config::from_toml_str(&format!("{}\n[settings]\nmonth = 13\n", BASE)).is_err());
        assert!(Config::from_toml_str(&format!("{}\n[settings]\nhour = 24\n", BASE)).is_err());
        assert!(Config::from_toml_str(&BASE.replace("eta_el = 0.42", "eta_el = 1.2")).is_err());
        assert!(Config::from_toml_str(&BASE.replace("p_gas_min = 1.278", "p_gas_min = 3.0")).is_err());
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let without_boiler = BASE.replace("[boiler]", "[unused]");
        assert!(Config::from_toml_str(&without_boiler).is_err());
    }

    #[test]
    fn test_unknown_solver() {
        let config = Config::from_toml_str(&format!("{}\n[settings]\nsolver = \"gurobi\"\n", BASE)).unwrap();
        let err = config.solver_settings().unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }
}
