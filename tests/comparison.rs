//! Cross-model comparison on solved horizons
#![cfg(feature = "microlp")]

mod common;

use std::sync::Arc;

use chp_dispatch::analysis::{profit, Comparator, Divergence};
use chp_dispatch::domain::{FormulationKind, Metric};
use chp_dispatch::optimizer::{DirectDispatch, DispatchFormulation, DispatchRunner, NetworkDispatch, Selection};
use chp_dispatch::solver::SolverSettings;
use chp_dispatch::DispatchError;
use rstest::rstest;

use common::{flat, horizon, plant};

fn runner(chp_geq_boiler: bool) -> DispatchRunner {
    let settings = SolverSettings::default();
    DispatchRunner::new(
        DirectDispatch::new(settings),
        NetworkDispatch::new(settings).with_chp_geq_boiler(chp_geq_boiler),
    )
}

#[rstest]
#[case::small_demand(&[100.0, 100.0, 120.0, 90.0], &[1.0, 0.8, 1.1, 0.6])]
#[case::chp_covers_everything(&[150.0; 3], &[1.17, 0.9, 0.5])]
#[tokio::test]
async fn formulations_agree_when_ordering_is_not_binding(#[case] prices: &[f64], #[case] demand: &[f64]) {
    let ctx = Arc::new(horizon(prices, demand));
    let outcome = runner(true).run(ctx, Arc::new(plant()), Selection::Both).await;
    let (a, b) = outcome.pair().unwrap();

    let report = Comparator::default().compare(a, b).unwrap();
    assert_eq!(report.divergence, Divergence::Agreement, "{:?}", report.metrics);
    assert_eq!(report.reference, FormulationKind::Direct);
    assert!(report.steps.iter().all(|s| s.chp_gas_in.abs() < 1e-6));
}

#[tokio::test]
async fn formulations_agree_without_the_ordering_constraint() {
    let ctx = Arc::new(horizon(&[40.0, 95.0, 130.0, 300.0], &[3.0, 10.0, 6.0, 14.0]));
    let outcome = runner(false).run(ctx, Arc::new(plant()), Selection::Both).await;
    let (a, b) = outcome.pair().unwrap();
    assert!(Comparator::default().compare(a, b).unwrap().all_match());
}

#[tokio::test]
async fn ordering_constraint_divergence_is_explained() {
    // cheap power: the direct optimum heats with the boiler alone
    let ctx = Arc::new(flat(0.0, &[2.0, 2.0]));
    let params = Arc::new(plant());
    let outcome = runner(true).run(Arc::clone(&ctx), Arc::clone(&params), Selection::Both).await;
    let (a, b) = outcome.pair().unwrap();

    assert_eq!(a.total(Metric::ChpGasIn), 0.0);
    let shared = 2.0 / (0.458 + 0.836);
    for r in &b.records {
        assert!((r.chp_gas_in - shared).abs() < 1e-6);
        assert!((r.boiler_gas_in - shared).abs() < 1e-6);
    }

    let report = Comparator::default().compare(a, b).unwrap();
    assert_eq!(report.divergence, Divergence::ExplainedByChpBoilerOrdering { steps: 2 });
    let chp = report.metric(Metric::ChpGasIn).unwrap();
    assert!(chp.difference_pct.is_infinite());
    assert!(!chp.matches);

    // the extra constraint can only cost money
    let pa = profit(a, &ctx, &params).unwrap().profit;
    let pb = profit(b, &ctx, &params).unwrap().profit;
    assert!(pa > pb);
}

#[tokio::test]
async fn network_failure_leaves_direct_result_intact() {
    let ctx = Arc::new(flat(100.0, &[10.0, 12.0]));
    let outcome = runner(true).run(ctx, Arc::new(plant()), Selection::Both).await;

    assert!(outcome.get(FormulationKind::Direct).unwrap().is_ok());
    let err = outcome.get(FormulationKind::Network).unwrap().as_ref().unwrap_err();
    assert!(err.is_infeasible());
    assert!(outcome.pair().is_none());
}

#[test]
fn comparing_different_horizons_is_rejected() {
    let params = plant();
    let a = DirectDispatch::default().run(&flat(100.0, &[1.0, 1.0]), &params).unwrap();
    let b = DirectDispatch::default().run(&flat(100.0, &[1.0]), &params).unwrap();
    let err = Comparator::default().compare(&a, &b).unwrap_err();
    assert!(matches!(err, DispatchError::HorizonMismatch(_)));
}
