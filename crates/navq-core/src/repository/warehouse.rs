use navq_warehouse::{
    GroupingColumn, LatestNavFilter, NavEventFilter, NavEventRecord, Warehouse, WarehouseError,
};

use crate::domain::{NavEvent, NavKey, UtcDateTime};
use crate::error::EventError;
use crate::filter::{LatestQuerySpec, QuerySpec};
use crate::repository::{EventRepository, RepositoryError, RepositoryFuture};

/// Repository backed by the `DuckDB` warehouse.
///
/// Queries run on the blocking thread pool, one pooled connection per call.
#[derive(Clone)]
pub struct WarehouseRepository {
    warehouse: Warehouse,
}

impl WarehouseRepository {
    pub fn new(warehouse: Warehouse) -> Self {
        Self { warehouse }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    async fn run_blocking<T, F>(&self, operation: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Warehouse) -> Result<T, RepositoryError> + Send + 'static,
    {
        let warehouse = self.warehouse.clone();
        tokio::task::spawn_blocking(move || operation(&warehouse))
            .await
            .map_err(|error| RepositoryError::Unavailable(format!("warehouse task failed: {error}")))?
    }
}

impl EventRepository for WarehouseRepository {
    fn scan<'a>(&'a self, spec: &'a QuerySpec) -> RepositoryFuture<'a, Vec<NavEvent>> {
        let filter = NavEventFilter {
            column: grouping_column(spec.key()),
            key: spec.key().as_str().to_owned(),
            price_denoms: spec.price_denoms().as_slice().to_vec(),
            from_micros: spec.from().map(UtcDateTime::unix_micros_ceil),
            to_micros: spec.to().map(UtcDateTime::unix_micros),
            source: spec.data_source().map(str::to_owned),
        };

        Box::pin(self.run_blocking(move |warehouse| {
            warehouse
                .scan_nav_events(&filter)
                .map_err(unavailable)?
                .into_iter()
                .map(NavEvent::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(corrupt)
        }))
    }

    fn grouping_keys<'a>(
        &'a self,
        spec: &'a LatestQuerySpec,
    ) -> RepositoryFuture<'a, Vec<NavKey>> {
        let filter = latest_filter(spec);

        Box::pin(self.run_blocking(move |warehouse| {
            let keys = warehouse
                .nav_grouping_keys(&filter)
                .map_err(unavailable)?
                .into_iter()
                .map(|(column, value)| match column {
                    GroupingColumn::Denom => NavKey::Denom(value),
                    GroupingColumn::Scope => NavKey::Scope(value),
                })
                .collect();
            Ok(keys)
        }))
    }

    fn latest_for_key<'a>(
        &'a self,
        key: &'a NavKey,
        spec: &'a LatestQuerySpec,
    ) -> RepositoryFuture<'a, Option<NavEvent>> {
        let filter = latest_filter(spec);
        let column = grouping_column(key);
        let key = key.as_str().to_owned();

        Box::pin(self.run_blocking(move |warehouse| {
            warehouse
                .latest_nav_event(column, &key, &filter)
                .map_err(unavailable)?
                .map(NavEvent::try_from)
                .transpose()
                .map_err(corrupt)
        }))
    }
}

impl TryFrom<NavEventRecord> for NavEvent {
    type Error = EventError;

    fn try_from(record: NavEventRecord) -> Result<Self, Self::Error> {
        let key = NavKey::from_parts(record.denom, record.scope_id)?;
        let event_time = UtcDateTime::from_unix_micros(record.block_time_micros)?;

        Ok(Self::new(
            key,
            record.price_denom,
            record.price_amount,
            event_time,
            record.block_height,
        )?
        .with_volume(record.volume)
        .with_event_order(record.event_order)
        .with_provenance(record.tx_hash, record.event_type, record.source))
    }
}

impl From<&NavEvent> for NavEventRecord {
    fn from(event: &NavEvent) -> Self {
        Self {
            block_height: event.block_height,
            block_time_micros: event.event_time.unix_micros(),
            tx_hash: event.tx_hash.clone(),
            event_order: event.event_order,
            event_type: event.event_type.clone(),
            scope_id: event.key.scope_id().map(str::to_owned),
            denom: event.key.denom().map(str::to_owned),
            price_amount: event.price_amount,
            price_denom: event.price_denom.clone(),
            volume: event.volume,
            source: event.data_source.clone(),
        }
    }
}

fn grouping_column(key: &NavKey) -> GroupingColumn {
    match key {
        NavKey::Denom(_) => GroupingColumn::Denom,
        NavKey::Scope(_) => GroupingColumn::Scope,
    }
}

fn latest_filter(spec: &LatestQuerySpec) -> LatestNavFilter {
    LatestNavFilter {
        price_denoms: spec.price_denoms().as_slice().to_vec(),
        include_markers: spec.include_markers(),
        include_scopes: spec.include_scopes(),
        from_micros: spec.from().map(UtcDateTime::unix_micros_ceil),
    }
}

fn unavailable(error: WarehouseError) -> RepositoryError {
    tracing::warn!(%error, "warehouse query failed");
    RepositoryError::Unavailable(error.to_string())
}

fn corrupt(error: EventError) -> RepositoryError {
    tracing::warn!(%error, "stored nav event violates the event model");
    RepositoryError::Corrupt(error.to_string())
}
