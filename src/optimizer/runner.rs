use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::{DirectDispatch, DispatchFormulation, NetworkDispatch};
use crate::domain::{DispatchResult, FormulationKind, TimeSeriesContext, UnitParams};
use crate::error::DispatchError;

/// Which formulations to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Both,
    Only(FormulationKind),
}

impl Selection {
    pub fn includes(&self, kind: FormulationKind) -> bool {
        match self {
            Selection::Both => true,
            Selection::Only(only) => *only == kind,
        }
    }
}

impl From<Option<FormulationKind>> for Selection {
    fn from(only: Option<FormulationKind>) -> Self {
        only.map_or(Selection::Both, Selection::Only)
    }
}

/// Per-formulation outcomes. `None` means the formulation was not selected.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub direct: Option<Result<DispatchResult, DispatchError>>,
    pub network: Option<Result<DispatchResult, DispatchError>>,
}

impl RunOutcome {
    pub fn get(&self, kind: FormulationKind) -> Option<&Result<DispatchResult, DispatchError>> {
        match kind {
            FormulationKind::Direct => self.direct.as_ref(),
            FormulationKind::Network => self.network.as_ref(),
        }
    }

    /// Successful results, direct first
    pub fn results(&self) -> impl Iterator<Item = &DispatchResult> {
        self.direct
            .iter()
            .chain(self.network.iter())
            .filter_map(|r| r.as_ref().ok())
    }

    /// Both results, when both formulations ran and succeeded
    pub fn pair(&self) -> Option<(&DispatchResult, &DispatchResult)> {
        match (&self.direct, &self.network) {
            (Some(Ok(a)), Some(Ok(b))) => Some((a, b)),
            _ => None,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = (FormulationKind, &DispatchError)> {
        [
            (FormulationKind::Direct, &self.direct),
            (FormulationKind::Network, &self.network),
        ]
        .into_iter()
        .filter_map(|(kind, r)| match r {
            Some(Err(e)) => Some((kind, e)),
            _ => None,
        })
    }
}

/// Runs the formulations on blocking worker threads.
///
/// Each run owns its model; inputs are shared read-only. An error or a panic in
/// one run is recorded for that run only.
#[derive(Debug, Clone)]
pub struct DispatchRunner {
    direct: DirectDispatch,
    network: NetworkDispatch,
    parallel: bool,
}

impl DispatchRunner {
    pub fn new(direct: DirectDispatch, network: NetworkDispatch) -> Self {
        Self {
            direct,
            network,
            parallel: true,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub async fn run(
        &self,
        ctx: Arc<TimeSeriesContext>,
        params: Arc<UnitParams>,
        selection: Selection,
    ) -> RunOutcome {
        let started = Instant::now();
        info!(
            steps = ctx.len(),
            from = %ctx.first_timestamp(),
            to = %ctx.last_timestamp(),
            parallel = self.parallel,
            "starting dispatch runs"
        );

        let direct = run_selected(
            selection.includes(FormulationKind::Direct),
            self.direct.clone(),
            Arc::clone(&ctx),
            Arc::clone(&params),
        );
        let network = run_selected(
            selection.includes(FormulationKind::Network),
            self.network.clone(),
            ctx,
            params,
        );

        let (direct, network) = if self.parallel {
            tokio::join!(direct, network)
        } else {
            let direct = direct.await;
            (direct, network.await)
        };

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "dispatch runs finished");
        RunOutcome { direct, network }
    }
}

async fn run_selected<F>(
    enabled: bool,
    formulation: F,
    ctx: Arc<TimeSeriesContext>,
    params: Arc<UnitParams>,
) -> Option<Result<DispatchResult, DispatchError>>
where
    F: DispatchFormulation + 'static,
{
    if !enabled {
        return None;
    }
    let kind = formulation.kind();
    let joined = tokio::task::spawn_blocking(move || formulation.run(&ctx, &params)).await;
    Some(joined.unwrap_or_else(|e| {
        tracing::error!(formulation = %kind, error = %e, "formulation task failed");
        Err(DispatchError::SolverNonOptimal(format!(
            "{} run aborted: {}",
            kind, e
        )))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoilerSpec, ChpSpec, Economics, Metric, TimeSeriesPoint};
    use crate::solver::SolverSettings;
    use chrono::{Duration, TimeZone, Utc};

    fn params() -> Arc<UnitParams> {
        Arc::new(
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
            .unwrap(),
        )
    }

    fn horizon(demand: &[f64]) -> Arc<TimeSeriesContext> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let points = demand
            .iter()
            .enumerate()
            .map(|(i, &d)| TimeSeriesPoint::new(start + Duration::hours(i as i64), 100.0, 30.0, d))
            .collect();
        Arc::new(TimeSeriesContext::new(points).unwrap())
    }

    fn runner() -> DispatchRunner {
        let settings = SolverSettings::default();
        DispatchRunner::new(DirectDispatch::new(settings), NetworkDispatch::new(settings))
    }

    #[test]
    fn test_selection() {
        assert!(Selection::Both.includes(FormulationKind::Network));
        let only = Selection::from(Some(FormulationKind::Direct));
        assert!(only.includes(FormulationKind::Direct));
        assert!(!only.includes(FormulationKind::Network));
    }

    #[cfg(feature = "microlp")]
    #[tokio::test]
    async fn test_failure_is_isolated() {
        // feasible for the direct model, infeasible once CHP >= Boiler applies
        let outcome = runner().run(horizon(&[10.0]), params(), Selection::Both).await;

        let direct = outcome.direct.as_ref().unwrap().as_ref().unwrap();
        assert!((direct.total(Metric::ChpGasIn) - 2.556).abs() < 1e-6);
        assert!(outcome.network.as_ref().unwrap().as_ref().unwrap_err().is_infeasible());
        assert!(outcome.pair().is_none());
        assert_eq!(outcome.errors().count(), 1);
    }

    #[cfg(feature = "microlp")]
    #[tokio::test]
    async fn test_sequential_matches_parallel() {
        let ctx = horizon(&[1.0, 0.8, 1.1]);
        let parallel = runner().run(Arc::clone(&ctx), params(), Selection::Both).await;
        let sequential = runner()
            .parallel(false)
            .run(ctx, params(), Selection::Both)
            .await;
        let (a, b) = parallel.pair().unwrap();
        let (c, d) = sequential.pair().unwrap();
        assert_eq!(a.totals(), c.totals());
        assert_eq!(b.totals(), d.totals());
    }

    #[cfg(feature = "microlp")]
    #[tokio::test]
    async fn test_only_one_formulation() {
        let outcome = runner()
            .run(horizon(&[1.0]), params(), Selection::Only(FormulationKind::Network))
            .await;
        assert!(outcome.direct.is_none());
        assert_eq!(outcome.results().count(), 1);
    }
}
