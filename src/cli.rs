use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::FormulationKind;

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Cli {
    /// Human-readable logs instead of JSON.
    #[clap(long, global = true, env = "CHP_PRETTY_LOGS")]
    pub pretty_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Solve the dispatch with both formulations and compare them.
    #[clap(name = "run")]
    Run(RunArgs),

    /// List the solver backends compiled into this binary.
    #[clap(name = "solvers")]
    Solvers,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Configuration file.
    #[clap(long, short, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Hourly input CSV, overrides `data.input`.
    #[clap(long, short)]
    pub input: Option<PathBuf>,

    /// Output directory, overrides `output.dir`.
    #[clap(long, short)]
    pub output: Option<PathBuf>,

    /// Run a single formulation: `direct` or `network`.
    #[clap(long)]
    pub only: Option<FormulationKind>,

    /// Solver backend, overrides `settings.solver`.
    #[clap(long)]
    pub solver: Option<String>,

    /// Skip writing CSV files.
    #[clap(long)]
    pub no_export: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "chp-dispatch",
            "run",
            "--input",
            "data/year.csv",
            "--only",
            "network",
            "--pretty-logs",
        ])
        .unwrap();
        assert!(cli.pretty_logs);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.only, Some(FormulationKind::Network));
        assert_eq!(args.config, PathBuf::from("config/default.toml"));
        assert_eq!(args.input, Some(PathBuf::from("data/year.csv")));
    }

    #[test]
    fn test_rejects_unknown_formulation() {
        assert!(Cli::try_parse_from(["chp-dispatch", "run", "--only", "pypsa"]).is_err());
    }
}
