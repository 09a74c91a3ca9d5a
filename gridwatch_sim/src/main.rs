//! GridWatch simulator CLI
//!
//! Runs one sensor grid until the round limit or a stop request.

use clap::{CommandFactory, Parser};
use gridwatch_core::{DetectionConfig, RoundLimit};
use gridwatch_env::TokioContext;
use gridwatch_sim::{
    GridRunner, ReadingPlan, RunOutcome, SimConfig, SimError, StopSignal, DEFAULT_LOG_FILE,
    DEFAULT_SENTINEL,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// GridWatch distributed sensor grid simulator
#[derive(Parser, Debug)]
#[command(name = "gridwatch-sim")]
#[command(about = "Simulate an early-warning sensor grid with an aggregating base station", long_about = None)]
struct Args {
    /// Grid rows
    #[arg(allow_negative_numbers = true)]
    rows: i64,
    
    /// Grid columns
    #[arg(allow_negative_numbers = true)]
    cols: i64,
    
    /// Aggregator rounds before stopping (-1 = until a stop request)
    #[arg(allow_negative_numbers = true)]
    max_rounds: i64,
    
    /// Master seed for reproducible runs (omit for entropy and the real clock)
    #[arg(short, long)]
    seed: Option<u64>,
    
    /// Round cadence in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    
    /// Expected participant count (must equal rows * cols + 1)
    #[arg(long)]
    participants: Option<usize>,
    
    /// Marker file whose presence requests a stop
    #[arg(long, default_value = DEFAULT_SENTINEL)]
    sentinel: PathBuf,
    
    /// Event log file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,
    
    /// Do not write the event log file
    #[arg(long)]
    no_log_file: bool,
    
    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
    
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn sim_config(&self) -> Result<SimConfig, SimError> {
        let round_limit = RoundLimit::from_arg(self.max_rounds)?;
        let detection =
            DetectionConfig::default().with_interval(Duration::from_millis(self.interval_ms));
        
        let mut config = SimConfig::default()
            .with_grid(self.rows, self.cols)
            .with_round_limit(round_limit)
            .with_stop(StopSignal::marker_file(&self.sentinel))
            .with_detection(detection)
            .with_readings(ReadingPlan::Random)
            .with_event_log((!self.no_log_file).then(|| self.log_file.clone()));
        if let Some(participants) = self.participants {
            config = config.with_participants(participants);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        Ok(config)
    }
}

async fn run(args: &Args) -> Result<RunOutcome, SimError> {
    let config = args.sim_config()?;
    match args.seed {
        Some(_) => GridRunner::seeded(config).run().await,
        None => GridRunner::new(TokioContext::shared(), config).run().await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: tracing subscriber already installed");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    
    if !args.json {
        info!("GridWatch simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
    
    match run(&args).await {
        Ok(outcome) => {
            if args.json {
                match serde_json::to_string_pretty(&outcome.summary) {
                    Ok(json) => println!("{}", json),
                    Err(err) => {
                        error!("Failed to serialize summary: {}", err);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{}", outcome.summary);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            eprintln!("Error: {}", err);
            if err.is_config() {
                eprintln!("{}", Args::command().render_usage());
            }
            ExitCode::FAILURE
        }
    }
}
