//! perpbt: run and compare perpetuals strategies against a seeded synthetic
//! market.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use perp_backtester::trading::{
    BreakoutConfig, BreakoutStrategy, DcaConfig, DcaStrategy, GridConfig, GridStrategy, MeanReversionConfig,
    MeanReversionStrategy, MomentumConfig, MomentumStrategy,
};
use perp_backtester::backtest::lookback_period;
use perp_backtester::{generate_report, BacktestConfig, Backtester, RunResult, Strategy, StrategyConfig};

/// Perpetuals strategy backtester CLI.
#[derive(Parser)]
#[command(name = "perpbt")]
#[command(about = "Backtest leveraged-perpetuals strategies on synthetic data", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults apply to missing fields)
    #[arg(short, long, env = "PERPBT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info", env = "PERPBT_LOG_LEVEL")]
    log_level: String,

    /// Pair to trade
    #[arg(short, long, default_value = "ETH/USD", global = true)]
    pair: String,

    /// Length of the backtest period in days, ending now
    #[arg(short, long, default_value = "30", global = true)]
    days: i64,

    /// Initial capital
    #[arg(long, global = true)]
    capital: Option<f64>,

    /// Synthetic series seed
    #[arg(long, env = "PERPBT_SEED", global = true)]
    seed: Option<u64>,

    /// Starting price of the synthetic series for the selected pair
    #[arg(long, global = true)]
    base_price: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest a single strategy
    Run {
        /// Strategy to run
        #[arg(short, long, value_enum, default_value = "dca")]
        strategy: StrategyKind,

        /// Requested collateral per position
        #[arg(long)]
        position_size: Option<f64>,

        /// Print the full result as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Backtest every bundled strategy over the same period
    Compare {
        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyKind {
    Dca,
    Momentum,
    MeanReversion,
    Grid,
    Breakout,
}

impl StrategyKind {
    fn build(self, pair: &str) -> Box<dyn Strategy> {
        let config = StrategyConfig::default().for_pairs([pair]);
        match self {
            StrategyKind::Dca => Box::new(DcaStrategy::new(config, DcaConfig::default())),
            StrategyKind::Momentum => Box::new(MomentumStrategy::new(config, MomentumConfig::default())),
            StrategyKind::MeanReversion => {
                Box::new(MeanReversionStrategy::new(config, MeanReversionConfig::default()))
            }
            StrategyKind::Grid => Box::new(GridStrategy::new(config, GridConfig::default())),
            StrategyKind::Breakout => Box::new(BreakoutStrategy::new(config, BreakoutConfig::default())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = effective_config(&cli)?;
    let (start, end) = lookback_period(cli.days).context("Invalid --days")?;

    match cli.command {
        Commands::Run {
            strategy,
            position_size,
            json,
        } => {
            let backtester = Backtester::new(config.clone()).context("Invalid backtest configuration")?;
            let position_size = match position_size {
                Some(size) => Decimal::try_from(size).context("Invalid position size")?,
                None => config.position_size,
            };

            info!(
                strategy = ?strategy,
                pair = %cli.pair,
                days = cli.days,
                capital = %config.initial_capital,
                seed = config.synthetic.seed,
                "Starting backtest"
            );

            let mut strategy = strategy.build(&cli.pair);
            let result = backtester
                .run_backtest(strategy.as_mut(), &cli.pair, start, end, position_size)
                .context("Backtest failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", generate_report(&result, &result.strategy_name));
            }
        }

        Commands::Compare { json } => {
            let backtester = Backtester::new(config).context("Invalid backtest configuration")?;
            let strategies = StrategyKind::value_variants()
                .iter()
                .map(|kind| kind.build(&cli.pair))
                .collect();

            let results = backtester
                .compare_strategies(strategies, &cli.pair, start, end)
                .await
                .context("Strategy comparison failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_comparison(results.values());
            }
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Defaults, then the config file, then CLI/env overrides.
fn effective_config(cli: &Cli) -> Result<BacktestConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BacktestConfig::default(),
    };

    if let Some(capital) = cli.capital {
        config.initial_capital = Decimal::try_from(capital).context("Invalid capital")?;
    }
    if let Some(seed) = cli.seed {
        config.synthetic.seed = seed;
    }
    if let Some(price) = cli.base_price {
        let price = Decimal::try_from(price).context("Invalid base price")?;
        config.synthetic.base_prices.insert(cli.pair.clone(), price);
    }

    Ok(config)
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn print_comparison<'a>(results: impl Iterator<Item = &'a RunResult>) {
    println!(
        "\n{:<26} {:>7} {:>7} {:>12} {:>9} {:>8} {:>8}",
        "STRATEGY", "TRADES", "WIN%", "PNL", "MAX DD", "SHARPE", "PF"
    );
    println!("{}", "-".repeat(83));

    for result in results {
        println!(
            "{:<26} {:>7} {:>6.1}% {:>12.2} {:>8.2}% {:>8.2} {:>8.2}",
            truncate(&result.strategy_name, 24),
            result.total_trades(),
            result.win_rate() * 100.0,
            result.total_pnl().round_dp(2),
            result.max_drawdown(),
            result.sharpe_ratio(),
            result.profit_factor()
        );
    }
}

/// Truncate a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
