use std::sync::Arc;

use anyhow::{Context, Result};
use chp_dispatch::analysis::{calculate_kpis, hourly_profile, monthly_totals, profit};
use chp_dispatch::cli::{Cli, Command, RunArgs};
use chp_dispatch::config::Config;
use chp_dispatch::io::{
    apply_filters, export_comparison, export_model_summary, export_results, export_summary, load_horizon,
    FormulationSummary, RunSummary,
};
use chp_dispatch::optimizer::{DirectDispatch, DispatchFormulation, DispatchRunner, NetworkDispatch, Selection};
use chp_dispatch::solver::SolverKind;
use chp_dispatch::tables::{build_comparison_table, build_kpi_table, describe_divergence};
use chp_dispatch::telemetry::init_tracing;
use clap::Parser;
use strum::IntoEnumIterator;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.pretty_logs);

    match cli.command {
        Command::Solvers => {
            for kind in SolverKind::iter() {
                let state = if kind.is_available() { "available" } else { "not compiled in" };
                println!("{:<8} {}", kind, state);
            }
            Ok(())
        }
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut cfg = Config::load(Some(args.config.as_path()))?;
    if let Some(solver) = args.solver {
        cfg.settings.solver = solver;
    }

    let params = cfg.unit_params()?;
    let settings = cfg.solver_settings()?;
    let comparator = cfg.comparator()?;
    let output_dir = args.output.unwrap_or_else(|| cfg.output.dir.clone());
    let export = !args.no_export;

    let input = args
        .input
        .or_else(|| cfg.data.input.clone())
        .context("no input series: pass --input or set data.input")?;
    let horizon = apply_filters(&load_horizon(&input)?, &cfg.calendar_filter())?;

    info!(
        solver = %settings.kind,
        steps = horizon.len(),
        chp_geq_boiler = cfg.settings.chp_geq_boiler,
        "starting optimization"
    );

    let network = NetworkDispatch::new(settings).with_chp_geq_boiler(cfg.settings.chp_geq_boiler);
    if export && cfg.output.export_model {
        match network.build(&horizon, &params) {
            Ok(model) => {
                export_model_summary(&output_dir, &model.summary())?;
            }
            Err(e) => warn!(error = %e, "network model could not be built for export"),
        }
    }

    let runner = DispatchRunner::new(DirectDispatch::new(settings), network).parallel(cfg.settings.parallel);
    let ctx = Arc::new(horizon);
    let params = Arc::new(params);
    let outcome = runner
        .run(Arc::clone(&ctx), Arc::clone(&params), Selection::from(args.only))
        .await;

    for (kind, e) in outcome.errors() {
        error!(formulation = %kind, kind = e.kind(), error = %e, "no dispatch found for this horizon");
    }

    let mut formulations = Vec::new();
    for result in outcome.results() {
        if export {
            export_results(&output_dir, result, &ctx)?;
        }
        formulations.push(FormulationSummary {
            formulation: result.formulation,
            kpis: calculate_kpis(result),
            profit: profit(result, &ctx, &params)?,
            hourly: hourly_profile(result),
            monthly: monthly_totals(result),
        });
    }
    if formulations.is_empty() {
        anyhow::bail!("no formulation produced a dispatch");
    }
    let kpi_rows: Vec<_> = formulations.iter().map(|f| (f.formulation, f.kpis, f.profit)).collect();
    println!("{}", build_kpi_table(&kpi_rows));

    let report = match outcome.pair() {
        Some((direct, network)) => Some(comparator.compare(direct, network)?),
        None => None,
    };
    if let Some(report) = &report {
        println!("{}", build_comparison_table(report));
        println!("{}", describe_divergence(report.divergence));
    }

    if export {
        if let Some(report) = &report {
            export_comparison(&output_dir, report)?;
        }
        export_summary(
            &output_dir,
            &RunSummary {
                steps: ctx.len(),
                formulations,
                failures: outcome.errors().map(|(kind, e)| (kind, e.to_string())).collect(),
                comparison: report.as_ref().map(Into::into),
            },
        )?;
    }

    info!("optimization complete");
    Ok(())
}
