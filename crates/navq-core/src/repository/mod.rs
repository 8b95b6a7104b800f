//! Event repository contract.
//!
//! The core never talks to storage directly; it asks an [`EventRepository`]
//! for three things:
//!
//! | Method | Returns |
//! |--------|---------|
//! | [`scan`](EventRepository::scan) | Every event matching a [`QuerySpec`], oldest first |
//! | [`grouping_keys`](EventRepository::grouping_keys) | Candidate keys for the latest path |
//! | [`latest_for_key`](EventRepository::latest_for_key) | The newest admitted event for one key |
//!
//! Ordering everywhere is `(event_time, block_height, event_order)`.

mod memory;
mod warehouse;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::{NavEvent, NavKey};
use crate::error::QueryError;
use crate::filter::{LatestQuerySpec, QuerySpec};

pub use memory::InMemoryRepository;
pub use warehouse::WarehouseRepository;

/// Boxed future returned by repository methods.
pub type RepositoryFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Failures reported by a repository.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The store could not be reached or queried.
    #[error("{0}")]
    Unavailable(String),
    /// Stored data violates the event model.
    #[error("corrupt event data: {0}")]
    Corrupt(String),
}

impl From<RepositoryError> for QueryError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Unavailable(message) => Self::RepositoryUnavailable(message),
            RepositoryError::Corrupt(message) => Self::Internal(message),
        }
    }
}

/// Read access to stored NAV events.
///
/// Implementations must be deterministic for a fixed data set and safe to
/// call from many concurrent requests.
pub trait EventRepository: Send + Sync {
    /// All events matching `spec`, ascending by ordering key. Not paginated.
    fn scan<'a>(&'a self, spec: &'a QuerySpec) -> RepositoryFuture<'a, Vec<NavEvent>>;

    /// Keys that may have a latest event: denoms when markers are included,
    /// scope ids when scopes are included. Denoms come first, each group
    /// ascending.
    fn grouping_keys<'a>(
        &'a self,
        spec: &'a LatestQuerySpec,
    ) -> RepositoryFuture<'a, Vec<NavKey>>;

    /// The maximal event for `key` by ordering key among those `spec`
    /// admits, or `None` when there is none.
    fn latest_for_key<'a>(
        &'a self,
        key: &'a NavKey,
        spec: &'a LatestQuerySpec,
    ) -> RepositoryFuture<'a, Option<NavEvent>>;
}

impl<R> EventRepository for Arc<R>
where
    R: EventRepository + ?Sized,
{
    fn scan<'a>(&'a self, spec: &'a QuerySpec) -> RepositoryFuture<'a, Vec<NavEvent>> {
        (**self).scan(spec)
    }

    fn grouping_keys<'a>(
        &'a self,
        spec: &'a LatestQuerySpec,
    ) -> RepositoryFuture<'a, Vec<NavKey>> {
        (**self).grouping_keys(spec)
    }

    fn latest_for_key<'a>(
        &'a self,
        key: &'a NavKey,
        spec: &'a LatestQuerySpec,
    ) -> RepositoryFuture<'a, Option<NavEvent>> {
        (**self).latest_for_key(key, spec)
    }
}
