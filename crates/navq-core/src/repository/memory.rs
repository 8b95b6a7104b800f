use std::collections::BTreeSet;

use crate::domain::{NavEvent, NavKey};
use crate::filter::{LatestQuerySpec, QuerySpec};
use crate::latest::select_latest;
use crate::repository::{EventRepository, RepositoryFuture};

/// Immutable in-process event store.
///
/// Useful for tests and for serving a fixed snapshot. The key universe it
/// reports for the latest path is every stored key of an included kind,
/// regardless of price denom or time bounds.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    events: Vec<NavEvent>,
}

impl InMemoryRepository {
    pub fn new(events: Vec<NavEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl FromIterator<NavEvent> for InMemoryRepository {
    fn from_iter<I: IntoIterator<Item = NavEvent>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl EventRepository for InMemoryRepository {
    fn scan<'a>(&'a self, spec: &'a QuerySpec) -> RepositoryFuture<'a, Vec<NavEvent>> {
        Box::pin(async move {
            let mut matching: Vec<NavEvent> = self
                .events
                .iter()
                .filter(|event| spec.matches(event))
                .cloned()
                .collect();
            matching.sort_by_key(NavEvent::ordering_key);
            Ok(matching)
        })
    }

    fn grouping_keys<'a>(
        &'a self,
        spec: &'a LatestQuerySpec,
    ) -> RepositoryFuture<'a, Vec<NavKey>> {
        Box::pin(async move {
            let keys: BTreeSet<&NavKey> = self
                .events
                .iter()
                .map(|event| &event.key)
                .filter(|key| spec.includes(key))
                .collect();
            Ok(keys.into_iter().cloned().collect())
        })
    }

    fn latest_for_key<'a>(
        &'a self,
        key: &'a NavKey,
        spec: &'a LatestQuerySpec,
    ) -> RepositoryFuture<'a, Option<NavEvent>> {
        Box::pin(async move {
            let candidates = self
                .events
                .iter()
                .filter(|event| &event.key == key && spec.admits(event));
            Ok(select_latest(candidates).cloned())
        })
    }
}
