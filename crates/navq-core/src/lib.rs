//! # navq Core
//!
//! Query resolution for NAV (net asset value) events.
//!
//! ## Overview
//!
//! Given a filter set, this crate deterministically selects, orders and
//! paginates NAV events for a token denomination (marker) or a scope, and
//! separately resolves the latest event per grouping key.
//!
//! - **Filter validation** of raw requests into canonical queries
//! - **Event repository** contract with in-memory and `DuckDB` backends
//! - **Latest resolution** with time, block height, event order tie-breaking
//! - **Pagination** with page metadata
//! - **Response envelope** with metadata and structured errors
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Page size limits and query timeout |
//! | [`domain`] | `NavEvent`, `NavKey`, `PriceDenomSet`, `UtcDateTime` |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Validation and query errors |
//! | [`filter`] | Request types and the filter validator |
//! | [`latest`] | Latest-per-key resolver |
//! | [`pagination`] | Page slicing and metadata |
//! | [`repository`] | `EventRepository` trait and implementations |
//! | [`service`] | `NavQueryService` orchestration |
//!
//! ## Quick Start
//!
//! ```rust
//! use navq_core::{
//!     InMemoryRepository, NavEvent, NavEventRequest, NavKey, NavQueryService, UtcDateTime,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let time = UtcDateTime::parse("2024-01-01T00:00:00Z")?;
//!     let event = NavEvent::new(NavKey::Denom("nhash".into()), "usd", 1234, time, 1)?;
//!     let service = NavQueryService::new(InMemoryRepository::new(vec![event]));
//!
//!     let page = service
//!         .get_nav_events(&NavEventRequest::for_denom("nhash"))
//!         .await?;
//!     assert_eq!(page.total_items, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every operation is all-or-nothing and returns a [`QueryError`] with a
//! stable code:
//!
//! ```rust
//! use navq_core::QueryError;
//!
//! fn describe(error: &QueryError) -> &'static str {
//!     if error.retryable() {
//!         "try again later"
//!     } else {
//!         error.code()
//!     }
//! }
//! ```

pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod latest;
pub mod pagination;
pub mod repository;
pub mod service;

pub use config::{NavQueryConfig, QueryLimits};
pub use domain::{NavEvent, NavKey, NavSource, PriceDenomSet, UtcDateTime};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, MetaError};
pub use error::{ConfigError, EventError, QueryError, ValidationError};
pub use filter::{
    validate, validate_latest, LatestNavEventRequest, LatestQuerySpec, NavEventRequest,
    PaginationRequest, QuerySpec,
};
pub use latest::{select_latest, LatestResolver};
pub use pagination::{paginate, PageInfo, PageResult};
pub use repository::{
    EventRepository, InMemoryRepository, RepositoryError, RepositoryFuture, WarehouseRepository,
};
pub use service::{LatestNavEvents, NavEventPage, NavQueryService};

pub use navq_warehouse::{NavEventRecord, Warehouse, WarehouseConfig, WarehouseError};
