use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::Economics;
use crate::error::DispatchError;

/// One hour of market and demand data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    /// Electricity sale price (EUR/MWh)
    pub price_electricity: f64,
    /// Gas purchase price, excluding carbon (EUR/MWh)
    pub price_gas: f64,
    /// Heat to be delivered in this hour (MWh)
    pub heat_demand: f64,
}

impl TimeSeriesPoint {
    pub fn new(
        timestamp: DateTime<Utc>,
        price_electricity: f64,
        price_gas: f64,
        heat_demand: f64,
    ) -> Self {
        Self {
            timestamp,
            price_electricity,
            price_gas,
            heat_demand,
        }
    }

    fn validate(&self) -> Result<(), DispatchError> {
        if !self.price_electricity.is_finite() || !self.price_gas.is_finite() {
            return Err(DispatchError::InvalidHorizon(format!(
                "non-finite price at {}",
                self.timestamp
            )));
        }
        if !self.heat_demand.is_finite() || self.heat_demand < 0.0 {
            return Err(DispatchError::InvalidHorizon(format!(
                "heat demand at {} must be finite and non-negative, got {}",
                self.timestamp, self.heat_demand
            )));
        }
        Ok(())
    }
}

/// The ordered hourly series one optimization call works on.
///
/// Immutable once constructed. `new` only accepts a contiguous hourly grid:
/// timestamps strictly increasing, exactly one hour apart. Filling gaps is the
/// job of whoever produced the data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesContext {
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeriesContext {
    pub fn new(points: Vec<TimeSeriesPoint>) -> Result<Self, DispatchError> {
        Self::check_points(&points)?;

        for pair in points.windows(2) {
            let step = pair[1].timestamp - pair[0].timestamp;
            if step != Duration::hours(1) {
                return Err(DispatchError::InvalidHorizon(format!(
                    "expected hourly step between {} and {}, found {} minutes",
                    pair[0].timestamp,
                    pair[1].timestamp,
                    step.num_minutes()
                )));
            }
        }

        Ok(Self { points })
    }

    /// Sub-selection of an already validated grid, e.g. "every hour 12 of March".
    ///
    /// Order and uniqueness are preserved, contiguity is not required since the
    /// selection never invents data.
    pub fn select<F>(&self, mut keep: F) -> Result<Self, DispatchError>
    where
        F: FnMut(&TimeSeriesPoint) -> bool,
    {
        let points: Vec<_> = self.points.iter().copied().filter(|p| keep(p)).collect();
        Self::check_points(&points)?;
        Ok(Self { points })
    }

    fn check_points(points: &[TimeSeriesPoint]) -> Result<(), DispatchError> {
        if points.is_empty() {
            return Err(DispatchError::InvalidHorizon(
                "horizon contains no time steps".to_string(),
            ));
        }
        for point in points {
            point.validate()?;
        }
        for pair in points.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(DispatchError::InvalidHorizon(format!(
                    "timestamps must be strictly increasing: {} follows {}",
                    pair[1].timestamp, pair[0].timestamp
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn price_electricity(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price_electricity).collect()
    }

    pub fn heat_demand(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.heat_demand).collect()
    }

    /// Gas price plus the carbon cost of burning one MWh of gas
    pub fn gas_cost_total(&self, economics: &Economics) -> Vec<f64> {
        let carbon = economics.carbon_cost_per_mwh_gas();
        self.points.iter().map(|p| p.price_gas + carbon).collect()
    }

    pub fn first_timestamp(&self) -> DateTime<Utc> {
        self.points[0].timestamp
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.points[self.points.len() - 1].timestamp
    }
}

/// Calendar filter applied to a loaded horizon
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CalendarFilter {
    #[serde(default)]
    pub months: Vec<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
}

impl CalendarFilter {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty() && self.day.is_none() && self.hour.is_none()
    }

    pub fn matches(&self, timestamp: &DateTime<Utc>) -> bool {
        (self.months.is_empty() || self.months.contains(&timestamp.month()))
            && self.day.map_or(true, |d| timestamp.day() == d)
            && self.hour.map_or(true, |h| timestamp.hour() == h)
    }

    pub fn apply(&self, ctx: &TimeSeriesContext) -> Result<TimeSeriesContext, DispatchError> {
        if self.is_empty() {
            return Ok(ctx.clone());
        }
        ctx.select(|p| self.matches(&p.timestamp)).map_err(|_| {
            DispatchError::InvalidHorizon(format!(
                "series is empty after filtering (months={:?}, day={:?}, hour={:?})",
                self.months, self.day, self.hour
            ))
        })
    }
}
