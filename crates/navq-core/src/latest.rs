//! Latest-event-per-key resolution.

use std::collections::HashSet;

use crate::domain::{NavEvent, NavKey};
use crate::error::QueryError;
use crate::filter::LatestQuerySpec;
use crate::repository::EventRepository;

/// Resolves the newest event for every key a repository enumerates.
pub struct LatestResolver<'r, R: ?Sized> {
    repository: &'r R,
}

impl<'r, R> LatestResolver<'r, R>
where
    R: EventRepository + ?Sized,
{
    pub fn new(repository: &'r R) -> Self {
        Self { repository }
    }

    /// One event per key, in the repository's key enumeration order.
    ///
    /// Keys without an admitted event are left out. A repository failure
    /// fails the whole call.
    pub async fn resolve(&self, spec: &LatestQuerySpec) -> Result<Vec<NavEvent>, QueryError> {
        let keys = self.repository.grouping_keys(spec).await?;
        let mut seen: HashSet<NavKey> = HashSet::with_capacity(keys.len());
        let mut latest = Vec::with_capacity(keys.len());

        for key in keys {
            if !spec.includes(&key) {
                return Err(contract_violation(format!(
                    "repository enumerated excluded key {key}"
                )));
            }
            if seen.contains(&key) {
                continue;
            }

            match self.repository.latest_for_key(&key, spec).await? {
                Some(event) => {
                    check_latest_contract(&key, spec, &event)?;
                    latest.push(event);
                }
                None => tracing::debug!(%key, "no admitted nav event, omitting key"),
            }
            seen.insert(key);
        }

        Ok(latest)
    }
}

/// The maximal event by `(event_time, block_height, event_order)`.
///
/// On equal times the larger block height wins, then the larger event order.
pub fn select_latest<'a, I>(events: I) -> Option<&'a NavEvent>
where
    I: IntoIterator<Item = &'a NavEvent>,
{
    events.into_iter().max_by_key(|event| event.ordering_key())
}

fn check_latest_contract(
    key: &NavKey,
    spec: &LatestQuerySpec,
    event: &NavEvent,
) -> Result<(), QueryError> {
    if &event.key != key {
        return Err(contract_violation(format!(
            "latest event for {key} carries key {}",
            event.key
        )));
    }
    if !spec.admits(event) {
        return Err(contract_violation(format!(
            "latest event for {key} at {} ({}) is outside the requested filter",
            event.event_time, event.price_denom
        )));
    }
    Ok(())
}

fn contract_violation(message: String) -> QueryError {
    tracing::warn!(%message, "repository contract violation");
    QueryError::Internal(message)
}
