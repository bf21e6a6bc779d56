//! CLI argument definitions for tickval.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `value` | Run a full DCF valuation for a ticker |
//! | `fcf` | Show the historical free-cash-flow derivation |
//! | `sources` | List data source capabilities |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `table` | Output format (table, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--mock` | `false` | Serve deterministic offline data |
//! | `--timeout-ms` | `10000` | Request timeout in ms |

use clap::{Args, Parser, Subcommand, ValueEnum};

/// DCF valuation from the command line.
///
/// Fetches financial statements (SEC EDGAR with Yahoo Finance fallback) and
/// market data, then discounts ten years of projected free cash flow plus a
/// perpetuity-growth terminal value back to a per-share figure.
#[derive(Debug, Parser)]
#[command(
    name = "tickval",
    author,
    version,
    about = "Discounted cash flow valuation for listed companies"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Serve deterministic offline data instead of calling providers.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Request timeout budget in milliseconds.
    #[arg(long, global = true, default_value_t = 10_000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Readable table for terminal display.
    Table,
    /// Single JSON envelope.
    Json,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a full DCF valuation for a ticker.
    ///
    /// # Examples
    ///
    ///   tickval value AAPL
    ///   tickval value MSFT --growth-method cagr --terminal-growth 2.0
    ///   tickval value KO --growth-method manual --growth-rate 4.0 --discount-rate 9.0
    Value(ValueArgs),

    /// Show the historical free-cash-flow derivation for a ticker.
    ///
    /// # Examples
    ///
    ///   tickval fcf AAPL
    ///   tickval fcf AAPL --years 4 --format json
    Fcf(FcfArgs),

    /// List data source capability matrix.
    Sources(SourcesArgs),
}

/// Growth-rate methods selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GrowthMethodArg {
    /// Mean of year-over-year growth rates (last 5 years).
    Average,
    /// Compound annual growth rate (5-year window).
    Cagr,
    /// Latest year-over-year growth only.
    Recent,
    /// Use --growth-rate directly.
    Manual,
}

/// Arguments for the `value` command. Rates are given in percent
/// (e.g. `--terminal-growth 2.5` means 2.5%).
#[derive(Debug, Args)]
pub struct ValueArgs {
    /// Market symbol to value (e.g. AAPL).
    pub symbol: String,

    /// How to derive the FCF growth rate.
    #[arg(long, value_enum, default_value_t = GrowthMethodArg::Average)]
    pub growth_method: GrowthMethodArg,

    /// Manual growth rate in percent; required with --growth-method manual.
    #[arg(long)]
    pub growth_rate: Option<f64>,

    /// Manual discount rate in percent. Omitted means WACC is estimated
    /// from market data and statements.
    #[arg(long)]
    pub discount_rate: Option<f64>,

    /// Risk-free rate in percent, used by the CAPM leg of auto-WACC.
    #[arg(long, default_value_t = 4.0)]
    pub risk_free_rate: f64,

    /// Market risk premium in percent, used by the CAPM leg of auto-WACC.
    #[arg(long, default_value_t = 6.0)]
    pub market_risk_premium: f64,

    /// Terminal (perpetuity) growth rate in percent.
    #[arg(long, default_value_t = 2.5)]
    pub terminal_growth: f64,

    /// Projection horizon in years.
    #[arg(long, default_value_t = 10)]
    pub years: usize,
}

/// Arguments for the `fcf` command.
#[derive(Debug, Args)]
pub struct FcfArgs {
    /// Market symbol to inspect.
    pub symbol: String,

    /// Trailing fiscal years to show.
    #[arg(long, default_value_t = 5)]
    pub years: usize,
}

/// Arguments for the `sources` command.
#[derive(Debug, Args)]
pub struct SourcesArgs {
    /// Include detailed capability information.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}
