use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};

use macroalloc::{
    ReportView, RunOverrides, ScenarioFile, init_logging, validate, write_report,
};
use macroalloc_core::model::Strategy;
use macroalloc_core::pipeline;

#[derive(Parser, Debug)]
#[command(name = "macroalloc")]
#[command(about = "Regime-aware portfolio allocation with Monte Carlo ranking")]
struct Cli {
    /// Write logs to `{dir}/macroalloc.log` instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify, generate, simulate and rank portfolios for a scenario
    Run(RunArgs),
    /// Check a scenario file without simulating
    Validate {
        /// Scenario YAML file
        scenario: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario YAML file
    scenario: PathBuf,

    /// Master seed for the run
    #[arg(long)]
    seed: Option<u64>,

    /// Strategy override (conservative, balanced, growth)
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Number of candidate portfolios
    #[arg(short, long)]
    portfolios: Option<usize>,

    /// Monte Carlo trials per candidate
    #[arg(long)]
    trials: Option<usize>,

    /// Simulated periods per trial
    #[arg(long)]
    horizon: Option<usize>,

    /// Candidates shown in the ranking table
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Also write the full report (.yaml, .yml or .json)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref(), &cli.log_level)?;

    match cli.command {
        Command::Run(args) => run(args),
        Command::Validate { scenario } => {
            let scenario = ScenarioFile::load(&scenario)?.into_scenario()?;
            let summary = validate(&scenario)?;
            let regimes = summary
                .regimes
                .iter()
                .map(|r| r.label())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "ok: {} observations x {} indicators, {} assets, {} return periods",
                summary.observations, summary.features, summary.assets, summary.periods
            );
            println!("regimes: {regimes} ({} rule pairs)", summary.rule_pairs);
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut scenario = ScenarioFile::load(&args.scenario)?.into_scenario()?;
    let overrides = RunOverrides {
        seed: args.seed,
        strategy: args.strategy,
        portfolios: args.portfolios,
        trials: args.trials,
        horizon: args.horizon,
    };
    overrides.apply(&mut scenario.config);
    tracing::info!(
        scenario = %args.scenario.display(),
        seed = scenario.config.run.seed,
        portfolios = scenario.config.run.num_portfolios,
        "starting run"
    );

    let report = pipeline::run(&scenario.inputs, &scenario.config).wrap_err("run failed")?;
    print!("{}", ReportView::new(&report, &scenario.inputs, args.top));

    if let Some(path) = &args.output {
        write_report(path, &report)?;
        println!("\nReport written to {}", path.display());
    }
    Ok(())
}
