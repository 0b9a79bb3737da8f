//! GVAR forecast CLI
//!
//! Runs unconditional forecasts, conditional forecasts and variance
//! decompositions on a posterior file and writes CSV tables plus a JSON report.
//!
//! Example:
//!   gvar_forecast unconditional --posterior posterior.json --horizon 8 --out-dir out
//!   gvar_forecast conditional --posterior posterior.json --constraints paths.csv --horizon 8
//!   gvar_forecast decompose --posterior posterior.json --horizon 12 --full

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gvar_forecast::report::{
    create_output, write_decomposition_csv, write_holdout_csv, write_quantiles_csv, JsonReport, ReportConfig,
};
use gvar_forecast::{
    ConditionalConfig, ConstraintSpec, DecompositionConfig, DecompositionMode, ForecastConfig, ForecastEngine,
    LogProgress, PinvTolerance, ShockIdentification,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gvar_forecast")]
#[command(version, about = "Posterior-predictive forecasts for Bayesian Global VAR models")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate the posterior-predictive distribution
    Unconditional {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Forecast conditional on future paths read from a CSV file
    Conditional {
        #[command(flatten)]
        common: CommonArgs,

        /// CSV with columns horizon,variable,value[,sd]
        #[arg(long)]
        constraints: PathBuf,

        /// Conditional paths per draw
        #[arg(long, default_value = "1")]
        replications: usize,

        /// Relative singular value cutoff; inverts every nonzero value when omitted
        #[arg(long)]
        pinv_tol: Option<f64>,

        #[arg(long, value_enum, default_value = "cholesky")]
        identification: Identification,
    },
    /// Forecast-error variance decomposition
    Decompose {
        #[command(flatten)]
        common: CommonArgs,

        /// Keep every draw and report quantiles instead of the running mean
        #[arg(long)]
        full: bool,

        #[arg(long, value_enum, default_value = "generalized")]
        identification: Identification,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Posterior JSON file
    #[arg(short, long)]
    posterior: PathBuf,

    /// Forecast horizon
    #[arg(long, default_value = "8")]
    horizon: usize,

    /// Worker threads
    #[arg(short, long, default_value = "1")]
    workers: usize,

    #[arg(long, default_value = "42")]
    seed: u64,

    /// Drop draws flagged unstable by the estimator
    #[arg(long)]
    stable_only: bool,

    /// Directory for the CSV tables and JSON report
    #[arg(short, long, default_value = "forecast_output")]
    out_dir: PathBuf,

    /// Separator between country and variable in names
    #[arg(long, default_value = ".")]
    separator: String,

    /// Decimal places in CSV output
    #[arg(long, default_value = "6")]
    precision: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Identification {
    Cholesky,
    Generalized,
}

impl From<Identification> for ShockIdentification {
    fn from(value: Identification) -> Self {
        match value {
            Identification::Cholesky => ShockIdentification::Cholesky,
            Identification::Generalized => ShockIdentification::Generalized,
        }
    }
}

fn open_engine<'a>(common: &CommonArgs, progress: &'a LogProgress) -> Result<ForecastEngine<'a>> {
    let mut engine = ForecastEngine::load(&common.posterior)
        .with_context(|| format!("loading posterior {}", common.posterior.display()))?
        .with_observer(progress);
    if common.stable_only {
        engine = engine.stable_only();
    }
    fs::create_dir_all(&common.out_dir)
        .with_context(|| format!("creating output directory {}", common.out_dir.display()))?;
    Ok(engine)
}

fn report_config(common: &CommonArgs) -> ReportConfig {
    ReportConfig {
        separator: common.separator.clone(),
        precision: common.precision,
    }
}

fn forecast_config(common: &CommonArgs) -> ForecastConfig {
    ForecastConfig {
        horizon: common.horizon,
        workers: common.workers,
        seed: common.seed,
        save_draws: true,
    }
}

fn run_unconditional(common: &CommonArgs) -> Result<()> {
    let progress = LogProgress::new("unconditional");
    let engine = open_engine(common, &progress)?;
    let fc = engine.unconditional(&forecast_config(common))?;
    let report = report_config(common);

    write_quantiles_csv(
        create_output(common.out_dir.join("unconditional_quantiles.csv"))?,
        &fc.variables,
        &fc.summary,
        &report,
    )?;
    if let Some(holdout) = &fc.holdout {
        write_holdout_csv(
            create_output(common.out_dir.join("unconditional_holdout.csv"))?,
            &fc.variables,
            holdout,
            &report,
        )?;
        println!(
            "Holdout: total log score {:.4}, mean abs error {:.4}",
            holdout.total_log_score(),
            holdout.mean_rmse()
        );
    }
    JsonReport::new("unconditional", &fc).save(common.out_dir.join("unconditional.json"))?;
    println!("Unconditional forecast for {} draws written to {}", fc.n_draws, common.out_dir.display());
    Ok(())
}

fn run_conditional(
    common: &CommonArgs,
    constraints: &Path,
    replications: usize,
    pinv_tol: Option<f64>,
    identification: Identification,
) -> Result<()> {
    let progress = LogProgress::new("conditional");
    let engine = open_engine(common, &progress)?;
    let fc = engine.unconditional(&forecast_config(common))?;

    let spec = ConstraintSpec::load_csv(constraints, common.horizon, &fc.variables, &common.separator)
        .with_context(|| format!("reading constraints {}", constraints.display()))?;
    let config = ConditionalConfig {
        workers: common.workers,
        seed: common.seed,
        identification: identification.into(),
        pinv_tolerance: pinv_tol.map_or(PinvTolerance::Untruncated, PinvTolerance::Relative),
        replications,
        save_draws: false,
    };
    let cond = engine.conditional(&fc, &spec, &config)?;
    let report = report_config(common);

    write_quantiles_csv(
        create_output(common.out_dir.join("conditional_quantiles.csv"))?,
        &cond.variables,
        &cond.summary,
        &report,
    )?;
    if let Some(holdout) = &cond.holdout {
        write_holdout_csv(
            create_output(common.out_dir.join("conditional_holdout.csv"))?,
            &cond.variables,
            holdout,
            &report,
        )?;
    }
    JsonReport::new("conditional", &cond).save(common.out_dir.join("conditional.json"))?;
    println!(
        "Conditional forecast ({} constrained cells, {} paths) written to {}",
        cond.n_constrained,
        cond.n_paths,
        common.out_dir.display()
    );
    Ok(())
}

fn run_decompose(common: &CommonArgs, full: bool, identification: Identification) -> Result<()> {
    let progress = LogProgress::new("decomposition");
    let engine = open_engine(common, &progress)?;
    let config = DecompositionConfig {
        horizon: common.horizon,
        workers: common.workers,
        seed: common.seed,
        identification: identification.into(),
        mode: if full {
            DecompositionMode::FullDistribution
        } else {
            DecompositionMode::RunningMean
        },
    };
    let table = engine.decompose(&config)?;

    write_decomposition_csv(
        create_output(common.out_dir.join("decomposition.csv"))?,
        &table,
        &report_config(common),
    )?;
    JsonReport::new("decomposition", &table).save(common.out_dir.join("decomposition.json"))?;
    println!("Decomposition over {} draws written to {}", table.n_draws, common.out_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Unconditional { common } => run_unconditional(common),
        Command::Conditional {
            common,
            constraints,
            replications,
            pinv_tol,
            identification,
        } => run_conditional(common, constraints, *replications, *pinv_tol, *identification),
        Command::Decompose {
            common,
            full,
            identification,
        } => run_decompose(common, *full, *identification),
    }
}
