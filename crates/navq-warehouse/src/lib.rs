//! # navq Warehouse
//!
//! DuckDB-backed storage for NAV (net asset value) events.
//!
//! ## Overview
//!
//! The warehouse owns the durable `nav_events` table and exposes the three
//! read capabilities the query core relies on:
//!
//! - an ordered scan by grouping key and time ([`Warehouse::scan_nav_events`])
//! - enumeration of marker and scope keys ([`Warehouse::nav_grouping_keys`])
//! - a max-by-key lookup ([`Warehouse::latest_nav_event`])
//!
//! Every statement is parameterized; request values are never interpolated
//! into SQL text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use navq_warehouse::{GroupingColumn, NavEventFilter, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     let filter = NavEventFilter::for_key(GroupingColumn::Denom, "nhash");
//!     let rows = warehouse.scan_nav_events(&filter)?;
//!     println!("Found {} events", rows.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `nav_events` | One row per observed NAV event, unique on block/tx/order |
//! | `ingest_log` | Ingestion audit log |
//! | `schema_migrations` | Applied migration versions |

pub mod chain;
pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, Row, ToSql};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::duckdb::{ConnectionPool, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A record offered for ingestion violates the event model.
    #[error("invalid nav event record: {0}")]
    InvalidRecord(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for navq data.
    pub navq_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let navq_home = resolve_navq_home();
        let db_path = navq_home.join("cache").join("warehouse.duckdb");
        Self {
            navq_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Default configuration with the database relocated to `db_path`.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

/// Column that carries an event's grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingColumn {
    /// Token marker events, keyed by `denom`.
    Denom,
    /// Scope events, keyed by `scope_id`.
    Scope,
}

impl GroupingColumn {
    const fn column(self) -> &'static str {
        match self {
            Self::Denom => "denom",
            Self::Scope => "scope_id",
        }
    }
}

/// A stored NAV event row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEventRecord {
    /// Height of the block that emitted the event.
    pub block_height: i64,
    /// Block time as microseconds since the Unix epoch (UTC).
    pub block_time_micros: i64,
    /// Transaction hash.
    pub tx_hash: String,
    /// Position of the event inside the transaction.
    pub event_order: i32,
    /// Chain event type name.
    pub event_type: String,
    /// Scope identifier, for scope events.
    pub scope_id: Option<String>,
    /// Token denomination, for marker events.
    pub denom: Option<String>,
    /// Scaled price amount.
    pub price_amount: i64,
    /// Denomination the price is expressed in.
    pub price_denom: String,
    /// Number of units the price covers.
    pub volume: i64,
    /// Reporting source (e.g. "metadata", "market").
    pub source: String,
}

impl NavEventRecord {
    fn validate(&self) -> Result<(), WarehouseError> {
        match (&self.denom, &self.scope_id) {
            (Some(_), Some(_)) => Err(WarehouseError::InvalidRecord(format!(
                "event {}:{} sets both denom and scope_id",
                self.tx_hash, self.event_order
            ))),
            (None, None) => Err(WarehouseError::InvalidRecord(format!(
                "event {}:{} sets neither denom nor scope_id",
                self.tx_hash, self.event_order
            ))),
            _ if self.price_denom.trim().is_empty() => Err(WarehouseError::InvalidRecord(
                format!(
                    "event {}:{} has an empty price denom",
                    self.tx_hash, self.event_order
                ),
            )),
            _ => Ok(()),
        }
    }
}

/// Filter for ordered historical scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEventFilter {
    pub column: GroupingColumn,
    pub key: String,
    /// Empty means no price denom restriction.
    pub price_denoms: Vec<String>,
    /// Inclusive lower bound, microseconds since epoch.
    pub from_micros: Option<i64>,
    /// Inclusive upper bound, microseconds since epoch.
    pub to_micros: Option<i64>,
    pub source: Option<String>,
}

impl NavEventFilter {
    /// Filter matching every event of one grouping key.
    pub fn for_key(column: GroupingColumn, key: impl Into<String>) -> Self {
        Self {
            column,
            key: key.into(),
            price_denoms: Vec::new(),
            from_micros: None,
            to_micros: None,
            source: None,
        }
    }
}

/// Filter for latest-per-key resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestNavFilter {
    /// Empty means no price denom restriction.
    pub price_denoms: Vec<String>,
    pub include_markers: bool,
    pub include_scopes: bool,
    /// Inclusive lower bound, microseconds since epoch.
    pub from_micros: Option<i64>,
}

const NAV_EVENT_COLUMNS: &str = "block_height, epoch_us(block_time), tx_hash, event_order, \
     event_type, scope_id, denom, price_amount, price_denom, volume, source";

/// The main warehouse interface for NAV event storage.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    pool: ConnectionPool,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, pool };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Initialize the database schema.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.pool.acquire()?;
        migrations::apply_migrations(&connection)?;
        let versions = migrations::applied_versions(&connection)?;
        tracing::debug!(
            db_path = %self.config.db_path.display(),
            ?versions,
            "warehouse schema ready"
        );
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Ingest NAV events in one transaction.
    ///
    /// Rows already present (same block height, tx hash and event order) are
    /// ignored, so re-ingesting a batch is harmless. Returns the number of
    /// newly inserted rows.
    pub fn ingest_nav_events(
        &self,
        request_id: &str,
        rows: &[NavEventRecord],
    ) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        for row in rows {
            row.validate()?;
        }

        let connection = self.pool.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut inserted = 0;
            for row in rows {
                let params: [&dyn ToSql; 11] = [
                    &row.block_height,
                    &row.block_time_micros,
                    &row.tx_hash,
                    &row.event_order,
                    &row.event_type,
                    &row.scope_id,
                    &row.denom,
                    &row.price_amount,
                    &row.price_denom,
                    &row.volume,
                    &row.source,
                ];
                inserted += connection.execute(
                    "INSERT OR IGNORE INTO nav_events \
                     (block_height, block_time, tx_hash, event_order, event_type, scope_id, \
                      denom, price_amount, price_denom, volume, source, updated_at) \
                     VALUES (?, make_timestamp(?), ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
                    params.as_slice(),
                )?;
            }

            let row_count = rows.len() as i64;
            let params: [&dyn ToSql; 2] = [&request_id, &row_count];
            connection.execute(
                "INSERT INTO ingest_log (request_id, dataset, status, row_count, timestamp) \
                 VALUES (?, 'nav_events', 'ok', ?, CURRENT_TIMESTAMP)",
                params.as_slice(),
            )?;

            Ok(inserted)
        })();

        let inserted = finalize_transaction(&connection, result)?;
        tracing::debug!(request_id, offered = rows.len(), inserted, "ingested nav events");
        Ok(inserted)
    }

    /// Total number of stored NAV events.
    pub fn count_nav_events(&self) -> Result<u64, WarehouseError> {
        let connection = self.pool.acquire()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM nav_events", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Scan events for one grouping key, oldest first.
    ///
    /// Ordering is `block_time`, then `block_height`, then `event_order`,
    /// all ascending, which is total over the table's unique key.
    pub fn scan_nav_events(
        &self,
        filter: &NavEventFilter,
    ) -> Result<Vec<NavEventRecord>, WarehouseError> {
        let mut sql = format!(
            "SELECT {NAV_EVENT_COLUMNS} FROM nav_events WHERE {} = ?",
            filter.column.column()
        );
        let mut params: Vec<&dyn ToSql> = Vec::new();
        params.push(&filter.key);

        push_price_denoms(&mut sql, &mut params, &filter.price_denoms);
        if let Some(from) = &filter.from_micros {
            sql.push_str(" AND block_time >= make_timestamp(?)");
            params.push(from);
        }
        if let Some(to) = &filter.to_micros {
            sql.push_str(" AND block_time <= make_timestamp(?)");
            params.push(to);
        }
        if let Some(source) = &filter.source {
            sql.push_str(" AND source = ?");
            params.push(source);
        }
        sql.push_str(" ORDER BY block_time ASC, block_height ASC, event_order ASC");

        let connection = self.pool.acquire()?;
        let rows = query_records(&connection, &sql, &params)?;
        tracing::debug!(
            column = filter.column.column(),
            key = %filter.key,
            rows = rows.len(),
            "scanned nav events"
        );
        Ok(rows)
    }

    /// Enumerate grouping keys that have at least one event passing the
    /// filter: marker denoms first, then scope ids, each ascending.
    pub fn nav_grouping_keys(
        &self,
        filter: &LatestNavFilter,
    ) -> Result<Vec<(GroupingColumn, String)>, WarehouseError> {
        let mut columns = Vec::with_capacity(2);
        if filter.include_markers {
            columns.push(GroupingColumn::Denom);
        }
        if filter.include_scopes {
            columns.push(GroupingColumn::Scope);
        }

        let connection = self.pool.acquire()?;
        let mut keys = Vec::new();
        for column in columns {
            let name = column.column();
            let mut sql =
                format!("SELECT DISTINCT {name} FROM nav_events WHERE {name} IS NOT NULL");
            let mut params: Vec<&dyn ToSql> = Vec::new();
            push_latest_bounds(&mut sql, &mut params, filter);
            sql.push_str(&format!(" ORDER BY {name}"));

            let mut statement = connection.prepare(&sql)?;
            let mut rows = statement.query(params.as_slice())?;
            while let Some(row) = rows.next()? {
                keys.push((column, row.get::<_, String>(0)?));
            }
        }

        Ok(keys)
    }

    /// The most recent event for one key passing the filter, if any.
    ///
    /// "Most recent" is the maximum of `(block_time, block_height,
    /// event_order)`.
    pub fn latest_nav_event(
        &self,
        column: GroupingColumn,
        key: &str,
        filter: &LatestNavFilter,
    ) -> Result<Option<NavEventRecord>, WarehouseError> {
        let mut sql = format!(
            "SELECT {NAV_EVENT_COLUMNS} FROM nav_events WHERE {} = ?",
            column.column()
        );
        let mut params: Vec<&dyn ToSql> = Vec::new();
        params.push(&key);
        push_latest_bounds(&mut sql, &mut params, filter);
        sql.push_str(" ORDER BY block_time DESC, block_height DESC, event_order DESC LIMIT 1");

        let connection = self.pool.acquire()?;
        let mut rows = query_records(&connection, &sql, &params)?;
        Ok(rows.pop())
    }
}

/// Split a chain price attribute such as `"1234usd"` into amount and denom.
///
/// Returns `None` when there is no leading integer amount or no denom.
pub fn parse_price(input: &str) -> Option<(i64, String)> {
    let trimmed = input.trim().trim_matches('"');
    let digits_end = trimmed
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(trimmed.len(), |(index, _)| index);

    let (amount, denom) = trimmed.split_at(digits_end);
    if denom.is_empty() {
        return None;
    }
    let amount = amount.parse::<i64>().ok()?;
    Some((amount, denom.to_string()))
}

fn push_price_denoms<'a>(
    sql: &mut String,
    params: &mut Vec<&'a dyn ToSql>,
    price_denoms: &'a [String],
) {
    if price_denoms.is_empty() {
        return;
    }
    let placeholders = vec!["?"; price_denoms.len()].join(", ");
    sql.push_str(&format!(" AND price_denom IN ({placeholders})"));
    for denom in price_denoms {
        params.push(denom);
    }
}

fn push_latest_bounds<'a>(
    sql: &mut String,
    params: &mut Vec<&'a dyn ToSql>,
    filter: &'a LatestNavFilter,
) {
    push_price_denoms(sql, params, &filter.price_denoms);
    if let Some(from) = &filter.from_micros {
        sql.push_str(" AND block_time >= make_timestamp(?)");
        params.push(from);
    }
}

fn query_records(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<NavEventRecord>, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let mut rows = statement.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(read_record(row)?);
    }
    Ok(records)
}

fn read_record(row: &Row<'_>) -> Result<NavEventRecord, ::duckdb::Error> {
    Ok(NavEventRecord {
        block_height: row.get(0)?,
        block_time_micros: row.get(1)?,
        tx_hash: row.get(2)?,
        event_order: row.get(3)?,
        event_type: row.get(4)?,
        scope_id: row.get(5)?,
        denom: row.get(6)?,
        price_amount: row.get(7)?,
        price_denom: row.get(8)?,
        volume: row.get(9)?,
        source: row.get(10)?,
    })
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Resolve the navq home directory from environment or default.
fn resolve_navq_home() -> PathBuf {
    if let Some(path) = env::var_os("NAVQ_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".navq");
    }

    PathBuf::from(".navq")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DAY_MICROS: i64 = 86_400_000_000;

    fn open_warehouse(temp: &tempfile::TempDir) -> Warehouse {
        let navq_home = temp.path().join("navq-home");
        let db_path = navq_home.join("cache").join("warehouse.duckdb");
        Warehouse::open(WarehouseConfig {
            navq_home,
            db_path,
            max_pool_size: 2,
        })
        .expect("warehouse open")
    }

    fn marker(denom: &str, height: i64, day: i64, price_denom: &str) -> NavEventRecord {
        NavEventRecord {
            block_height: height,
            block_time_micros: day * DAY_MICROS,
            tx_hash: format!("tx-{height}"),
            event_order: 0,
            event_type: "provenance.marker.v1.EventSetNetAssetValue".to_string(),
            scope_id: None,
            denom: Some(denom.to_string()),
            price_amount: 1_000 + height,
            price_denom: price_denom.to_string(),
            volume: 1,
            source: "market".to_string(),
        }
    }

    #[test]
    fn ingest_rejects_record_with_both_keys() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(&temp);
        let mut record = marker("nhash", 1, 1, "usd");
        record.scope_id = Some("scope1".to_string());

        let error = warehouse
            .ingest_nav_events("req-001", &[record])
            .expect_err("must reject");
        assert!(matches!(error, WarehouseError::InvalidRecord(_)));
        assert_eq!(warehouse.count_nav_events().expect("count"), 0);
    }

    #[test]
    fn ingest_uses_parameterized_queries() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(&temp);
        let dangerous = r#"nhash'; DROP TABLE nav_events; --"#;

        warehouse
            .ingest_nav_events("req-002", &[marker(dangerous, 1, 1, "usd")])
            .expect("ingest");

        let rows = warehouse
            .scan_nav_events(&NavEventFilter::for_key(GroupingColumn::Denom, dangerous))
            .expect("scan");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].denom.as_deref(), Some(dangerous));
    }

    #[test]
    fn reingesting_the_same_batch_keeps_one_copy() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(&temp);
        let batch = vec![marker("nhash", 1, 1, "usd"), marker("nhash", 2, 2, "usd")];

        warehouse.ingest_nav_events("req-003", &batch).expect("first");
        warehouse.ingest_nav_events("req-004", &batch).expect("second");

        assert_eq!(warehouse.count_nav_events().expect("count"), 2);
    }

    #[test]
    fn scan_orders_by_time_then_height_then_event_order() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(&temp);
        let mut same_block_later = marker("nhash", 7, 3, "usd");
        same_block_later.event_order = 1;
        let batch = vec![
            same_block_later,
            marker("nhash", 7, 3, "usd"),
            marker("nhash", 6, 3, "usd"),
            marker("nhash", 9, 1, "usd"),
        ];
        warehouse.ingest_nav_events("req-005", &batch).expect("ingest");

        let rows = warehouse
            .scan_nav_events(&NavEventFilter::for_key(GroupingColumn::Denom, "nhash"))
            .expect("scan");
        let order: Vec<(i64, i32)> = rows
            .iter()
            .map(|row| (row.block_height, row.event_order))
            .collect();
        assert_eq!(order, vec![(9, 0), (6, 0), (7, 0), (7, 1)]);
        assert_eq!(rows[0].block_time_micros, DAY_MICROS);
    }

    #[test]
    fn scan_applies_price_denom_and_time_bounds() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(&temp);
        let batch = vec![
            marker("nhash", 1, 1, "usd"),
            marker("nhash", 2, 2, "usd"),
            marker("nhash", 3, 3, "usdt"),
            marker("nhash", 4, 4, "usd"),
        ];
        warehouse.ingest_nav_events("req-006", &batch).expect("ingest");

        let mut filter = NavEventFilter::for_key(GroupingColumn::Denom, "nhash");
        filter.price_denoms = vec!["usd".to_string()];
        filter.from_micros = Some(2 * DAY_MICROS);
        filter.to_micros = Some(4 * DAY_MICROS);

        let heights: Vec<i64> = warehouse
            .scan_nav_events(&filter)
            .expect("scan")
            .iter()
            .map(|row| row.block_height)
            .collect();
        assert_eq!(heights, vec![2, 4]);
    }

    #[test]
    fn latest_prefers_higher_block_when_times_tie() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(&temp);
        let batch = vec![marker("nhash", 10, 5, "usd"), marker("nhash", 11, 5, "usd")];
        warehouse.ingest_nav_events("req-007", &batch).expect("ingest");

        let latest = warehouse
            .latest_nav_event(
                GroupingColumn::Denom,
                "nhash",
                &LatestNavFilter {
                    include_markers: true,
                    ..LatestNavFilter::default()
                },
            )
            .expect("latest")
            .expect("present");
        assert_eq!(latest.block_height, 11);
    }

    #[test]
    fn grouping_keys_list_markers_before_scopes() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(&temp);
        let mut scope = marker("unused", 3, 1, "usd");
        scope.denom = None;
        scope.scope_id = Some("scope1".to_string());
        let batch = vec![scope, marker("zeta", 1, 1, "usd"), marker("alpha", 2, 1, "usd")];
        warehouse.ingest_nav_events("req-008", &batch).expect("ingest");

        let keys = warehouse
            .nav_grouping_keys(&LatestNavFilter {
                include_markers: true,
                include_scopes: true,
                ..LatestNavFilter::default()
            })
            .expect("keys");
        assert_eq!(
            keys,
            vec![
                (GroupingColumn::Denom, "alpha".to_string()),
                (GroupingColumn::Denom, "zeta".to_string()),
                (GroupingColumn::Scope, "scope1".to_string()),
            ]
        );
    }

    #[test]
    fn parses_chain_price_attribute() {
        assert_eq!(parse_price("1234usd"), Some((1234, "usd".to_string())));
        assert_eq!(parse_price("\"50nhash\""), Some((50, "nhash".to_string())));
        assert_eq!(parse_price("usd"), None);
        assert_eq!(parse_price("1234"), None);
        assert_eq!(parse_price("-5usd"), None);
    }
}
