//! Behavior-driven tests for the DuckDB-backed NAV event store
//!
//! These tests verify HOW stored events flow through the query service:
//! ingestion, persistence and query results over a real warehouse file.

use std::sync::Arc;

use navq_core::{
    LatestNavEventRequest, NavEvent, NavEventRecord, NavEventRequest, NavKey, NavQueryConfig,
    NavQueryService, PaginationRequest, QueryLimits, UtcDateTime, Warehouse, WarehouseConfig,
    WarehouseError, WarehouseRepository,
};
use tempfile::tempdir;

fn open_warehouse(temp: &tempfile::TempDir) -> Warehouse {
    Warehouse::open(WarehouseConfig {
        navq_home: temp.path().to_path_buf(),
        db_path: temp.path().join("cache").join("warehouse.duckdb"),
        max_pool_size: 2,
    })
    .expect("warehouse open")
}

fn event(key: NavKey, price_denom: &str, time: &str, height: i64, order: i32) -> NavEvent {
    let time = UtcDateTime::parse(time).expect("valid time");
    NavEvent::new(key, price_denom, 1_000 * height, time, height)
        .expect("valid event")
        .with_event_order(order)
        .with_provenance(format!("tx-{height}"), "EventSetNetAssetValue", "metadata")
}

fn records(events: &[NavEvent]) -> Vec<NavEventRecord> {
    events.iter().map(NavEventRecord::from).collect()
}

// =============================================================================
// Warehouse: Ingestion
// =============================================================================

#[test]
fn when_user_ingests_the_same_batch_twice_events_are_stored_once() {
    // Given: A fresh warehouse and a batch of three events
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let batch = records(&[
        event(NavKey::Denom("nhash".into()), "usd", "2024-01-01T00:00:00Z", 1, 0),
        event(NavKey::Denom("nhash".into()), "usd", "2024-01-02T00:00:00Z", 2, 0),
        event(NavKey::Scope("scope1".into()), "usd", "2024-01-02T00:00:00Z", 2, 1),
    ]);

    // When: The batch is ingested twice
    let first = warehouse.ingest_nav_events("req-001", &batch).expect("first ingest");
    warehouse.ingest_nav_events("req-002", &batch).expect("second ingest");

    // Then: Only one copy of each event exists
    assert_eq!(first, 3);
    assert_eq!(warehouse.count_nav_events().expect("count"), 3);
}

#[test]
fn when_user_ingests_an_event_without_a_key_the_whole_batch_is_rejected() {
    // Given: A batch where one record has neither denom nor scope id
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let mut batch = records(&[
        event(NavKey::Denom("nhash".into()), "usd", "2024-01-01T00:00:00Z", 1, 0),
        event(NavKey::Denom("nhash".into()), "usd", "2024-01-02T00:00:00Z", 2, 0),
    ]);
    batch[1].denom = None;

    // When: It is ingested
    let error = warehouse
        .ingest_nav_events("req-003", &batch)
        .expect_err("must reject");

    // Then: Nothing is stored
    assert!(matches!(error, WarehouseError::InvalidRecord(_)));
    assert_eq!(warehouse.count_nav_events().expect("count"), 0);
}

#[test]
fn when_user_reopens_the_warehouse_previous_events_are_still_there() {
    // Given: A warehouse with one stored event
    let temp = tempdir().expect("tempdir");
    {
        let warehouse = open_warehouse(&temp);
        warehouse
            .ingest_nav_events(
                "req-004",
                &records(&[event(
                    NavKey::Denom("nhash".into()),
                    "usd",
                    "2024-01-01T00:00:00Z",
                    1,
                    0,
                )]),
            )
            .expect("ingest");
    }

    // When: The same file is opened again
    let reopened = open_warehouse(&temp);

    // Then: The event survived and migrations did not reset the schema
    assert_eq!(reopened.count_nav_events().expect("count"), 1);
}

// =============================================================================
// Warehouse: Queries through the service
// =============================================================================

#[tokio::test]
async fn when_user_queries_stored_history_it_comes_back_ordered_and_paginated() {
    // Given: Five usd events stored out of order plus one in another denom
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let key = NavKey::Denom("usd.token".into());
    let mut events: Vec<NavEvent> = (1..=5)
        .map(|day| event(key.clone(), "usd", &format!("2024-01-0{day}T00:00:00Z"), day, 0))
        .collect();
    events.push(event(key.clone(), "nhash", "2024-01-03T00:00:00Z", 30, 0));
    events.reverse();
    warehouse
        .ingest_nav_events("req-005", &records(&events))
        .expect("ingest");
    let service = NavQueryService::new(WarehouseRepository::new(warehouse));

    // When: They ask for page 2 of size 2 priced in usd
    let request = NavEventRequest {
        price_denoms: vec!["usd".into()],
        pagination: Some(PaginationRequest {
            page: Some(2),
            page_size: Some(2),
        }),
        ..NavEventRequest::for_denom("usd.token")
    };
    let page = service.nav_event_page(&request).await.expect("query succeeds");

    // Then: They get the third and fourth events with full metadata
    let heights: Vec<i64> = page.items.iter().map(|event| event.block_height).collect();
    assert_eq!(heights, vec![3, 4]);
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.pagination.total_items, 5);
    assert_eq!(page.items[0].tx_hash, "tx-3");
    assert_eq!(page.items[0].data_source, "metadata");
}

#[tokio::test]
async fn when_user_asks_for_latest_the_store_breaks_ties_by_block_then_event_order() {
    // Given: Same-instant events for marker A across two blocks and two
    // event orders, plus an older marker B and a scope
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let a = NavKey::Denom("A".into());
    warehouse
        .ingest_nav_events(
            "req-006",
            &records(&[
                event(a.clone(), "usd", "2024-01-05T00:00:00Z", 10, 4),
                event(a.clone(), "usd", "2024-01-05T00:00:00Z", 11, 0),
                event(a.clone(), "usd", "2024-01-05T00:00:00Z", 11, 2),
                event(NavKey::Denom("B".into()), "usd", "2024-01-03T00:00:00Z", 3, 0),
                event(NavKey::Scope("scope1".into()), "usd", "2024-01-06T00:00:00Z", 12, 0),
            ]),
        )
        .expect("ingest");
    let service = NavQueryService::new(WarehouseRepository::new(warehouse));

    // When: They ask for the latest markers and scopes
    let latest = service
        .get_latest_nav_events(&LatestNavEventRequest {
            include_markers: true,
            include_scopes: true,
            ..LatestNavEventRequest::default()
        })
        .await
        .expect("query succeeds");

    // Then: A's winner is block 11 order 2, markers come before the scope
    let summary: Vec<(String, i64, i32)> = latest
        .iter()
        .map(|event| (event.key.to_string(), event.block_height, event.event_order))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("denom:A".to_string(), 11, 2),
            ("denom:B".to_string(), 3, 0),
            ("scope:scope1".to_string(), 12, 0),
        ]
    );
}

#[tokio::test]
async fn when_user_sets_a_latest_lower_bound_older_keys_drop_out() {
    // Given: Marker A updated recently and marker B only long ago
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    warehouse
        .ingest_nav_events(
            "req-007",
            &records(&[
                event(NavKey::Denom("A".into()), "usd", "2024-03-02T00:00:00Z", 20, 0),
                event(NavKey::Denom("B".into()), "usd", "2023-11-01T00:00:00Z", 2, 0),
            ]),
        )
        .expect("ingest");
    let service = NavQueryService::new(WarehouseRepository::new(warehouse));

    // When: They ask for markers updated since March 2024
    let latest = service
        .get_latest_nav_events(&LatestNavEventRequest {
            include_markers: true,
            from_date: Some("2024-03-01".into()),
            ..LatestNavEventRequest::default()
        })
        .await
        .expect("query succeeds");

    // Then: Only A is reported
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].key, NavKey::Denom("A".into()));
}

#[tokio::test]
async fn when_user_lowers_the_max_page_size_larger_requests_are_rejected() {
    // Given: A service configured with a max page size of 10
    let temp = tempdir().expect("tempdir");
    let config = NavQueryConfig {
        limits: QueryLimits::new(5, 10).expect("valid limits"),
        query_timeout_ms: None,
    };
    let service = NavQueryService::with_config(
        Arc::new(WarehouseRepository::new(open_warehouse(&temp))),
        config,
    );

    // When: They ask for 11 items per page
    let request = NavEventRequest {
        pagination: Some(PaginationRequest {
            page: None,
            page_size: Some(11),
        }),
        ..NavEventRequest::for_denom("nhash")
    };
    let error = service.get_nav_events(&request).await.expect_err("must fail");

    // Then: The request is rejected as invalid pagination
    assert_eq!(error.code(), "query.invalid_pagination");

    // And: Without a page size the configured default applies
    let page = service
        .get_nav_events(&NavEventRequest::for_denom("nhash"))
        .await
        .expect("query succeeds");
    assert_eq!(page.total_pages, 1);
    assert!(page.items.is_empty());
}
