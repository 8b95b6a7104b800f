//! CLI argument definitions for navq.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `events` | Historical NAV events for one denom or scope, paginated |
//! | `latest` | Latest NAV event per marker and/or scope |
//! | `ingest` | Load NAV events from a JSON file into the warehouse |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--db-path` | `$NAVQ_HOME/cache/warehouse.duckdb` | Warehouse file |
//! | `--timeout-ms` | `NAVQ_QUERY_TIMEOUT_MS` | Query timeout |
//! | `--max-page-size` | `NAVQ_MAX_PAGE_SIZE` or 1000 | Largest accepted page size |
//! | `--default-page-size` | `NAVQ_DEFAULT_PAGE_SIZE` or 50 | Page size when none is given |
//!
//! # Examples
//!
//! ```bash
//! navq ingest events.json
//! navq ingest --chain-tx txs.json
//! navq events --denom nhash --price-denom usd --from-date 2024-01-01 --pretty
//! navq latest --markers --scopes --price-denom usd
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// navq - NAV event query tool
#[derive(Debug, Parser)]
#[command(
    name = "navq",
    author,
    version,
    about = "Query historical and latest NAV events",
    long_about = "navq answers net-asset-value queries over a local DuckDB warehouse:\n\
\n\
  • Historical events per denom or scope, filtered and paginated\n\
  • Latest event per marker and/or scope\n\
  • Idempotent ingestion from JSON\n\
\n\
Use 'navq <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Warehouse database file.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Query timeout budget in milliseconds (at least 1).
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Largest page size a request may ask for.
    #[arg(long, global = true)]
    pub max_page_size: Option<u32>,

    /// Page size used when a request gives none.
    #[arg(long, global = true)]
    pub default_page_size: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Historical NAV events for one denom or scope.
    Events(EventsArgs),
    /// Latest NAV event per marker and/or scope.
    Latest(LatestArgs),
    /// Load NAV events from a JSON array file.
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Token denomination (marker) to query.
    #[arg(long)]
    pub denom: Option<String>,

    /// Scope identifier to query.
    #[arg(long = "scope")]
    pub scope_id: Option<String>,

    /// Restrict to these price denominations (repeatable).
    #[arg(long = "price-denom")]
    pub price_denoms: Vec<String>,

    /// Inclusive lower bound: YYYY-MM-DD or RFC3339.
    #[arg(long)]
    pub from_date: Option<String>,

    /// Inclusive upper bound: YYYY-MM-DD or RFC3339.
    #[arg(long)]
    pub to_date: Option<String>,

    /// Restrict to events reported by this data source.
    #[arg(long)]
    pub source: Option<String>,

    /// 1-based page number.
    #[arg(long, allow_negative_numbers = true)]
    pub page: Option<i64>,

    /// Events per page.
    #[arg(long, allow_negative_numbers = true)]
    pub page_size: Option<i64>,
}

#[derive(Debug, Args)]
pub struct LatestArgs {
    /// Restrict to these price denominations (repeatable).
    #[arg(long = "price-denom")]
    pub price_denoms: Vec<String>,

    /// Include token markers.
    #[arg(long, default_value_t = false)]
    pub markers: bool,

    /// Include scopes.
    #[arg(long, default_value_t = false)]
    pub scopes: bool,

    /// Inclusive lower bound: YYYY-MM-DD or RFC3339.
    #[arg(long)]
    pub from_date: Option<String>,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// JSON file holding an array of NAV events.
    pub file: PathBuf,

    /// Read FILE as chain transactions and decode their
    /// `EventSetNetAssetValue` attribute events.
    #[arg(long, default_value_t = false)]
    pub chain_tx: bool,
}
