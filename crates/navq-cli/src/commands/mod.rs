mod events;
mod ingest;
mod latest;

use std::sync::Arc;

use navq_core::{
    Envelope, EnvelopeError, EnvelopeMeta, NavQueryConfig, NavQueryService, QueryLimits,
    WarehouseRepository,
};
use navq_warehouse::{Warehouse, WarehouseConfig};
use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

const SCHEMA_VERSION: &str = "v1.0.0";

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            latency_ms: 0,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let request_id = Uuid::new_v4().to_string();
    let warehouse = open_warehouse(cli)?;

    let command_result = match &cli.command {
        Command::Events(args) => events::run(args, &query_service(cli, warehouse)?).await?,
        Command::Latest(args) => latest::run(args, &query_service(cli, warehouse)?).await?,
        Command::Ingest(args) => ingest::run(args, &warehouse, &request_id).await?,
    };

    let CommandResult {
        data,
        warnings,
        latency_ms,
    } = command_result;

    let mut meta = EnvelopeMeta::new(request_id, SCHEMA_VERSION, latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Envelope::success(meta, data))
}

/// Envelope describing a failed query, so machine consumers get structured
/// errors on stdout as well as the exit code.
pub fn error_envelope(error: &CliError) -> Option<Envelope<Value>> {
    let CliError::Query(query_error) = error else {
        return None;
    };

    let meta = EnvelopeMeta::new(Uuid::new_v4().to_string(), SCHEMA_VERSION, 0).ok()?;
    Envelope::with_errors(meta, Value::Null, vec![EnvelopeError::from(query_error)]).ok()
}

fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    let config = match &cli.db_path {
        Some(path) => WarehouseConfig::with_db_path(path.clone()),
        None => WarehouseConfig::default(),
    };
    tracing::debug!(db_path = %config.db_path.display(), "opening warehouse");
    Ok(Warehouse::open(config)?)
}

fn query_service(
    cli: &Cli,
    warehouse: Warehouse,
) -> Result<NavQueryService<WarehouseRepository>, CliError> {
    let mut config = NavQueryConfig::from_env()?;
    if cli.default_page_size.is_some() || cli.max_page_size.is_some() {
        config.limits = QueryLimits::new(
            cli.default_page_size.unwrap_or(config.limits.default_page_size),
            cli.max_page_size.unwrap_or(config.limits.max_page_size),
        )?;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.query_timeout_ms = Some(timeout_ms);
    }

    Ok(NavQueryService::with_config(
        Arc::new(WarehouseRepository::new(warehouse)),
        config,
    ))
}

fn elapsed_ms(started: std::time::Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
