use std::fs;
use std::time::Instant;

use navq_core::{NavEvent, UtcDateTime};
use navq_warehouse::chain::{decode_set_nav_events, ChainEvent, ChainTx};
use navq_warehouse::{NavEventRecord, Warehouse};
use serde::{Deserialize, Serialize};

use crate::cli::IngestArgs;
use crate::error::CliError;

use super::{elapsed_ms, CommandResult};

#[derive(Debug, Serialize)]
struct IngestResponseData {
    file: String,
    offered: usize,
    inserted: usize,
    skipped: usize,
    total_events: u64,
}

/// Transaction as read from a `--chain-tx` file.
#[derive(Debug, Deserialize)]
struct ChainTxInput {
    height: i64,
    txhash: String,
    timestamp: UtcDateTime,
    #[serde(default)]
    events: Vec<ChainEvent>,
}

impl From<ChainTxInput> for ChainTx {
    fn from(input: ChainTxInput) -> Self {
        Self {
            block_height: input.height,
            block_time_micros: input.timestamp.unix_micros(),
            tx_hash: input.txhash,
            events: input.events,
        }
    }
}

pub async fn run(
    args: &IngestArgs,
    warehouse: &Warehouse,
    request_id: &str,
) -> Result<CommandResult, CliError> {
    let contents = fs::read_to_string(&args.file)?;
    let (records, skipped) = decode_records(&contents, args.chain_tx)?;
    let offered = records.len();

    let started = Instant::now();
    let warehouse = warehouse.clone();
    let request_id = request_id.to_owned();
    let (inserted, total_events) = tokio::task::spawn_blocking(move || {
        let inserted = warehouse.ingest_nav_events(&request_id, &records)?;
        let total = warehouse.count_nav_events()?;
        Ok::<_, CliError>((inserted, total))
    })
    .await
    .map_err(|error| CliError::Command(format!("ingest task failed: {error}")))??;
    let latency_ms = elapsed_ms(started);

    tracing::info!(offered, inserted, skipped, "ingested nav events");

    let data = IngestResponseData {
        file: args.file.display().to_string(),
        offered,
        inserted,
        skipped,
        total_events,
    };
    let mut result = CommandResult::ok(serde_json::to_value(&data)?).with_latency(latency_ms);
    if inserted < offered {
        result = result.with_warning(format!(
            "{} event(s) already stored and skipped",
            offered - inserted
        ));
    }
    if skipped > 0 {
        result = result.with_warning(format!(
            "{skipped} nav event(s) lacked a denom, volume or price and were not stored"
        ));
    }

    Ok(result)
}

fn decode_records(
    contents: &str,
    chain_tx: bool,
) -> Result<(Vec<NavEventRecord>, usize), CliError> {
    if !chain_tx {
        let events: Vec<NavEvent> = serde_json::from_str(contents)?;
        return Ok((events.iter().map(NavEventRecord::from).collect(), 0));
    }

    let transactions: Vec<ChainTxInput> = serde_json::from_str(contents)?;
    let mut records = Vec::new();
    let mut skipped = 0;
    for input in transactions {
        let decoded = decode_set_nav_events(&ChainTx::from(input));
        records.extend(decoded.records);
        skipped += decoded.skipped;
    }

    Ok((records, skipped))
}
