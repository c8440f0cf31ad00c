//! Competitive alpha-investing solver CLI.
//!
//! `solve` runs the finite-horizon game between an oracle and a wealth-
//! constrained bidder; `risk` sweeps the spike-mixture process risk over
//! the null probability. Summaries go to stdout, logs to stderr.

use ab_core::config::{ConfigError, PayoffKind, PlayerSpec, RiskConfig, RunConfig};
use ab_core::logging::init_logging;
use ab_core::output::{self, OutputError, Summary};
use ab_core::solver::{
    find_process_risk_single, solve_matrix, solve_vector, MatrixSolution, VectorSolution,
};
use ab_core::utility::{Criterion, MatrixPayoff, MatrixUtility, VectorUtility};
use ab_core::wealth::{WealthError, WealthGrid};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wealth(#[from] WealthError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Backward-induction solver for competitive sequential testing
#[derive(Parser)]
#[command(name = "ab-core")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the two-player game over a finite horizon
    Solve(SolveArgs),

    /// Sweep spike-mixture process risk over the null probability
    Risk(RiskArgs),
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Score estimation risk instead of rejection counts
    #[arg(long, conflicts_with = "reject")]
    risk: bool,

    /// Score rejection counts (default)
    #[arg(long)]
    reject: bool,

    /// Criterion angle in degrees
    #[arg(short, long, default_value_t = 0.0)]
    angle: f64,

    /// Number of rounds
    #[arg(short = 'n', long, default_value_t = 100)]
    rounds: usize,

    /// Oracle starting wealth (defaults to oracle omega)
    #[arg(long)]
    oracle_w0: Option<f64>,

    /// Oracle spending rate (0 selects the universal rule)
    #[arg(long, default_value_t = 0.05)]
    oracle_prob: f64,

    /// Oracle payout per rejection (1 marks an unconstrained oracle)
    #[arg(long, default_value_t = 1.0)]
    oracle_omega: f64,

    /// Bidder starting wealth (defaults to bidder omega)
    #[arg(long)]
    bidder_w0: Option<f64>,

    /// Bidder spending rate (0 selects the universal rule)
    #[arg(long, default_value_t = 0.0)]
    bidder_prob: f64,

    /// Bidder payout per rejection
    #[arg(long, default_value_t = 0.5)]
    bidder_omega: f64,

    /// Write per-round tables and wealth grids under this directory
    #[arg(short, long)]
    write: Option<PathBuf>,

    /// Print the summary as JSON instead of the plain line
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct RiskArgs {
    /// Number of rounds
    #[arg(short = 'n', long, default_value_t = 100)]
    rounds: usize,

    /// Oracle level
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,

    /// Universal-code scale for the bidder's wealth
    #[arg(short, long, default_value_t = 2.0)]
    scale: f64,

    /// Payout per rejection
    #[arg(long, default_value_t = 0.5)]
    omega: f64,

    /// Alternative mean of the spike mixture
    #[arg(short = 'S', long, default_value_t = 2.5)]
    signal: f64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let result = match cli.command {
        Commands::Solve(args) => run_solve(args),
        Commands::Risk(args) => run_risk(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "run failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_solve(args: SolveArgs) -> Result<(), CliError> {
    let config = RunConfig {
        payoff: if args.risk {
            PayoffKind::Risk
        } else {
            PayoffKind::Reject
        },
        angle: args.angle,
        n_rounds: args.rounds,
        write_details: args.write.is_some(),
        oracle: PlayerSpec::new(args.oracle_w0, args.oracle_prob, args.oracle_omega),
        bidder: PlayerSpec::new(args.bidder_w0, args.bidder_prob, args.bidder_omega),
    };
    config.validate()?;
    tracing::info!(
        rounds = config.n_rounds,
        angle = config.angle,
        "solving game"
    );

    let bidder_wealth = config.bidder.build_grid(config.n_rounds)?;
    let summary = if config.oracle.is_unconstrained() {
        // the oracle holds a fixed level; its play lives in the utility
        let mut utility = match config.payoff {
            PayoffKind::Risk => VectorUtility::risk(config.angle, config.oracle.prob),
            PayoffKind::Reject => VectorUtility::reject(config.angle, config.oracle.prob),
        };
        let solution: VectorSolution = solve_vector(
            config.n_rounds,
            &mut utility,
            &bidder_wealth,
            config.write_details,
        );
        if let (Some(dir), Some(tables)) = (&args.write, &solution.tables) {
            std::fs::create_dir_all(dir)?;
            let stem = config.identifier();
            output::write_table(dir.join(format!("{stem}.objective")), &tables.objective)?;
            output::write_table(dir.join(format!("{stem}.oracle")), &tables.oracle)?;
            output::write_table(dir.join(format!("{stem}.bidder")), &tables.bidder)?;
            output::write_table(dir.join(format!("{stem}.mean")), &tables.mean)?;
            output::write_table(dir.join(format!("{stem}.prob")), &tables.reject_prob)?;
            output::write_grid(dir.join(format!("{stem}.wealth")), &bidder_wealth)?;
        }
        Summary {
            identifier: format!("{}", config.angle),
            omega: config.bidder.omega,
            rounds: config.n_rounds,
            objective: solution.objective,
            oracle: solution.oracle,
            bidder: solution.bidder,
        }
    } else {
        let oracle_wealth = config.oracle.build_grid(config.n_rounds)?;
        tracing::info!(
            oracle = %oracle_wealth.name(),
            bidder = %bidder_wealth.name(),
            "matrix game players"
        );
        let mut utility = match config.payoff {
            PayoffKind::Risk => MatrixUtility::new(MatrixPayoff::Risk, Criterion::angle(config.angle)),
            PayoffKind::Reject => {
                MatrixUtility::new(MatrixPayoff::Reject, Criterion::angle(config.angle))
            }
        };
        let solution: MatrixSolution = solve_matrix(
            config.n_rounds,
            &mut utility,
            &oracle_wealth,
            &bidder_wealth,
            config.write_details,
        );
        if let (Some(dir), Some(tables)) = (&args.write, &solution.tables) {
            std::fs::create_dir_all(dir)?;
            let stem = config.identifier();
            output::write_table(dir.join(format!("{stem}.objective")), &tables.objective)?;
            output::write_table(dir.join(format!("{stem}.row")), &tables.row)?;
            output::write_table(dir.join(format!("{stem}.col")), &tables.col)?;
            output::write_grid(dir.join(format!("{stem}.row_wealth")), &oracle_wealth)?;
            output::write_grid(dir.join(format!("{stem}.col_wealth")), &bidder_wealth)?;
        }
        Summary {
            identifier: utility.identifier(),
            // encode both payouts in one field, row side in the thousands
            omega: 1000.0 * config.oracle.omega + config.bidder.omega,
            rounds: config.n_rounds,
            objective: solution.objective,
            oracle: solution.row,
            bidder: solution.col,
        }
    };
    if args.json {
        println!("{}", summary.to_json()?);
    } else {
        println!("{summary}");
    }
    Ok(())
}

fn run_risk(args: RiskArgs) -> Result<(), CliError> {
    let config = RiskConfig {
        n_rounds: args.rounds,
        alpha: args.alpha,
        scale: args.scale,
        omega: args.omega,
        signal: args.signal,
    };
    config.validate()?;
    tracing::info!(
        rounds = config.n_rounds,
        scale = config.scale,
        omega = config.omega,
        signal = config.signal,
        "sweeping process risk"
    );

    let wealth = WealthGrid::scaled_universal(
        config.omega,
        config.omega,
        config.n_rounds,
        config.scale,
    )?;
    let mut utility = VectorUtility::risk(0.0, config.alpha);
    let mut p = 0.01;
    while p < 1.0 {
        let (oracle, bidder) =
            find_process_risk_single(config.n_rounds, p, config.signal, &mut utility, &wealth);
        println!("{p:.2} {oracle:.8} {bidder:.8}");
        p += 0.01;
    }
    Ok(())
}
