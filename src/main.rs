//! Horizon Trader
//!
//! Tick-driven single-instrument trading loop. Entries come from a model
//! signal, and every open position is bounded by the prediction horizon.

mod db;
mod features;
mod feed;
mod metrics;
mod models;
mod orchestrator;
mod signal;
mod sim;
mod trading;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::db::Journal;
use crate::feed::{Feed, ReplayFeed, SimulatedFeed};
use crate::orchestrator::Orchestrator;
use crate::signal::SignalModels;
use crate::sim::TradingEnv;
use crate::trading::{TradingConfig, ENV_PREFIX};

/// Horizon-bounded trading loop CLI.
#[derive(Parser)]
#[command(name = "horizon")]
#[command(about = "Tick-driven trading loop with horizon-bounded positions", long_about = None)]
struct Cli {
    /// JSON config file; environment and flags override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run against the simulated live feed
    Run {
        #[command(flatten)]
        opts: LoopArgs,
    },

    /// Drive the loop from a JSON-lines tick file
    Replay {
        /// Tick file, one JSON record per line
        file: PathBuf,

        #[command(flatten)]
        opts: LoopArgs,
    },

    /// Show the effective configuration
    Config,

    /// List trades recorded in a journal
    Trades {
        /// Journal database URL
        #[arg(short, long, default_value = "sqlite:./horizon.db?mode=rwc")]
        journal: String,

        /// Number of recent trades to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: i64,
    },

    /// Step the training environment through a tick file with HOLD actions
    EnvCheck {
        /// Tick file, one JSON record per line
        file: PathBuf,

        /// Observation window (defaults to rl_window_size)
        #[arg(short, long)]
        window: Option<usize>,
    },
}

/// Overrides shared by the loop commands.
#[derive(Args)]
struct LoopArgs {
    /// Alpha model artifact
    #[arg(long)]
    alpha_model: Option<String>,

    /// Use the entry policy instead of probability thresholds
    #[arg(long)]
    use_rl: bool,

    /// Hand open positions to the management policy
    #[arg(long)]
    use_position_rl: bool,

    /// Seconds between simulated ticks
    #[arg(short, long)]
    interval: Option<f64>,

    /// Journal lifecycle events to this database URL
    #[arg(short, long)]
    journal: Option<String>,
}

impl LoopArgs {
    fn apply(&self, config: &mut TradingConfig) {
        if let Some(path) = &self.alpha_model {
            config.alpha_model_path = path.clone();
        }
        if self.use_rl {
            config.use_rl = true;
        }
        if self.use_position_rl {
            config.use_position_rl = true;
        }
        if let Some(interval) = self.interval {
            config.data_feed_interval = interval;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "Failed to load .env file");
        }
    }

    let mut config = match &cli.config {
        Some(path) => TradingConfig::from_file(path)?,
        None => TradingConfig::default(),
    };
    config.apply_env()?;

    match cli.command {
        Commands::Run { opts } => {
            opts.apply(&mut config);
            config.validate()?;

            let feed = Feed::Simulated(SimulatedFeed::new(config.data_feed_interval));
            run_loop(config, feed, opts.journal.as_deref()).await?;
        }

        Commands::Replay { file, opts } => {
            opts.apply(&mut config);
            config.validate()?;

            info!(file = %file.display(), "Replaying ticks");
            let feed = Feed::Replay(ReplayFeed::open(&file).await?);
            run_loop(config, feed, opts.journal.as_deref()).await?;
        }

        Commands::Config => {
            config.validate()?;
            print_config(&config);
        }

        Commands::Trades { journal, limit } => {
            let journal = Journal::new(&journal).await?;
            let trades = journal.recent_trades(limit).await?;

            if trades.is_empty() {
                println!("No closed trades recorded.");
                return Ok(());
            }

            println!(
                "\n{:<6} {:<8} {:<6} {:>5} {:>10} {:>10} {:>9} {:>10} {:<8}",
                "ID", "SESSION", "SIDE", "UNITS", "ENTRY", "EXIT", "HOLD(s)", "P&L", "REASON"
            );
            println!("{}", "-".repeat(81));

            for trade in &trades {
                println!(
                    "{:<6} {:<8} {:<6} {:>5} {:>10.2} {:>10.2} {:>9.1} {:>10.2} {:<8}",
                    trade.id,
                    trade.session_id.get(..8).unwrap_or(trade.session_id.as_str()),
                    trade.side,
                    trade.units,
                    trade.entry_price,
                    trade.exit_price,
                    trade.exit_time - trade.entry_time,
                    trade.pnl,
                    trade.reason
                );
            }

            let totals = journal.trade_totals().await?;
            let win_rate = if totals.trades > 0 {
                totals.winners as f64 / totals.trades as f64 * 100.0
            } else {
                0.0
            };
            println!("\nTotal Trades:  {}", totals.trades);
            println!("Win Rate:      {:.1}%", win_rate);
            println!("Realized P&L:  {:.2}", totals.realized_pnl);
        }

        Commands::EnvCheck { file, window } => {
            let window = window.unwrap_or(config.rl_window_size);

            let mut feed = ReplayFeed::open(&file).await?;
            let mut ticks = Vec::new();
            let mut skipped = 0usize;
            while let Some(item) = feed.next_tick().await {
                match item.and_then(|tick| tick.validate().map(|_| tick).map_err(Into::into)) {
                    Ok(tick) => ticks.push(tick),
                    Err(e) => {
                        skipped += 1;
                        warn!("Skipping tick: {:#}", e);
                    }
                }
            }

            let mut env = TradingEnv::new(ticks, window, config.rl_fee, config.rl_risk_lambda)
                .context("Cannot build training environment")?;

            let mut observation_len = 0;
            let report = env.run_episode(|observation| {
                observation_len = observation.len();
                1
            })?;

            println!("\n=== Environment Check ===\n");
            println!("  Window:             {}", window);
            println!("  Observation Length: {}", observation_len);
            println!("  Ticks Skipped:      {}", skipped);
            println!("  Steps:              {}", report.steps);
            println!("  Cumulative Reward:  {:.6}", report.total_reward);
            println!("  Mean Reward:        {:.6}", report.mean_reward);
            println!("  Reward Std Dev:     {:.6}", report.reward_std_dev);
            println!("  Final Position:     {}", report.final_position);
        }
    }

    Ok(())
}

async fn run_loop(config: TradingConfig, feed: Feed, journal: Option<&str>) -> Result<()> {
    let models = SignalModels::load(&config)?;
    let mut orchestrator = Orchestrator::new(&config, models)?;

    if let Some(url) = journal {
        orchestrator = orchestrator.with_journal(Journal::new(url).await?);
    }

    orchestrator.run(feed).await?;
    Ok(())
}

fn print_config(config: &TradingConfig) {
    println!("\n=== Trading Configuration ===\n");
    println!("Lifecycle:");
    println!("  Prediction Horizon:   {}s", config.prediction_horizon);
    println!("  Profit Target:        {}", config.profit_target);
    println!("  Stop Loss:            {} (not used by rule exits)", config.stop_loss);
    println!("  Max Positions:        {}", config.max_positions);
    println!("  Feed Interval:        {}s", config.data_feed_interval);
    println!("  Feature Window:       {} ticks", config.feature_window());

    println!("\nEntry Decision:");
    if config.use_rl {
        println!("  Mode:                 policy");
        println!("  Policy:               {}", config.rl_model_path);
        println!("  Window:               {}", config.rl_window_size);
    } else {
        println!("  Mode:                 thresholds");
        println!("  Buy Above:            {}", config.alpha_threshold_up);
        println!("  Sell Below:           {}", config.alpha_threshold_down);
    }
    println!("  Alpha Model:          {}", config.alpha_model_path);

    println!("\nPosition Management:");
    if config.use_position_rl {
        println!("  Mode:                 policy");
        println!("  Policy:               {}", config.position_rl_model_path);
        println!("  Window:               {}", config.position_rl_window_size);
    } else {
        println!("  Mode:                 rules");
    }

    println!("\nTraining Environment:");
    println!("  Fee:                  {}", config.rl_fee);
    println!("  Risk Lambda:          {}", config.rl_risk_lambda);

    println!(
        "\nOverride any field with {}<FIELD_NAME> (e.g. {}PROFIT_TARGET).",
        ENV_PREFIX, ENV_PREFIX
    );
}
