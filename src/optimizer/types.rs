use std::time::Instant;

use tracing::{info, info_span, warn};

use crate::domain::{DispatchResult, FormulationKind, TimeSeriesContext, UnitParams};
use crate::error::DispatchError;

/// One way of expressing the CHP + boiler dispatch problem.
///
/// Implementations own their backend-specific model and solution types and
/// their sign conventions; only [`DispatchResult`] leaves `extract`.
pub trait DispatchFormulation: Send + Sync {
    /// A fully built model, consumed by `solve`
    type Model;
    /// The backend-native solution
    type Solution;

    fn kind(&self) -> FormulationKind;

    fn build(
        &self,
        ctx: &TimeSeriesContext,
        params: &UnitParams,
    ) -> Result<Self::Model, DispatchError>;

    /// Blocking solve. `Ok` means the solver proved optimality.
    fn solve(&self, model: Self::Model) -> Result<Self::Solution, DispatchError>;

    fn extract(
        &self,
        solution: &Self::Solution,
        ctx: &TimeSeriesContext,
        params: &UnitParams,
    ) -> DispatchResult;

    /// Build, solve and extract in one go
    fn run(
        &self,
        ctx: &TimeSeriesContext,
        params: &UnitParams,
    ) -> Result<DispatchResult, DispatchError> {
        let span = info_span!("formulation", name = %self.kind());
        let _guard = span.enter();
        let started = Instant::now();

        let outcome = self
            .build(ctx, params)
            .and_then(|model| self.solve(model))
            .map(|solution| self.extract(&solution, ctx, params));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(result) => info!(steps = result.len(), elapsed_ms, "dispatch found"),
            Err(e) => warn!(error = %e, kind = e.kind(), elapsed_ms, "no dispatch found for this horizon"),
        }
        outcome
    }
}
