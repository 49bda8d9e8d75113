use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "basketperf")]
#[command(
    version,
    about = "Basket performance and return attribution against benchmarks"
)]
#[command(
    long_about = "Compute daily returns, rebased performance curves, standard period returns (MTD, 1m, QTD, 3m, 6m, YTD, 12m), relative performance against mapped benchmarks, and per-ticker contribution for weighted baskets of securities."
)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Basket records CSV (basket,date,ticker,price,weight,...)
    #[arg(long, global = true)]
    pub baskets: Option<PathBuf>,

    /// Benchmark prices CSV (date,ticker,price)
    #[arg(long, global = true)]
    pub benchmarks: Option<PathBuf>,

    /// Basket to benchmark mapping CSV (basket,benchmark)
    #[arg(long, global = true)]
    pub mapping: Option<PathBuf>,

    /// As-of date (YYYY-MM-DD, YYYY-MM, or YYYY); defaults to the latest basket date
    #[arg(long = "as-of", global = true)]
    pub as_of: Option<String>,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show aligned daily returns, optionally cumulative or rebased
    Returns {
        /// Basket or benchmark to include (repeatable; default: all)
        #[arg(short = 'b', long = "basket")]
        names: Vec<String>,

        /// Start date; the first day in range is reset to a zero return
        #[arg(short, long)]
        from: Option<String>,

        /// End date (inclusive)
        #[arg(short, long)]
        to: Option<String>,

        /// Rebase to a starting value (default from config, usually 100)
        #[arg(long, num_args = 0..=1)]
        rebase: Option<Option<Decimal>>,

        /// Show growth of 1 instead of daily returns (ignored with --rebase)
        #[arg(long)]
        cumulative: bool,

        /// Also write the table to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show period returns for every basket and benchmark
    Summary,

    /// Show basket minus benchmark period returns
    Relative {
        /// Only this basket; fails if its benchmark is unavailable
        #[arg(short, long)]
        basket: Option<String>,
    },

    /// Show per-ticker contribution to a basket's period returns
    Contribution {
        /// Basket name
        basket: String,

        /// Period label (MTD, 1m, QTD, 3m, 6m, YTD, 12m); repeatable
        #[arg(short, long = "period")]
        periods: Vec<String>,
    },
}
