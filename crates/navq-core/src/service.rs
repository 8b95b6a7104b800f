//! Query orchestration: validation, repository access, ordering checks and
//! pagination composed into the two public operations.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::NavQueryConfig;
use crate::domain::NavEvent;
use crate::error::QueryError;
use crate::filter::{validate, validate_latest, LatestNavEventRequest, NavEventRequest, QuerySpec};
use crate::latest::LatestResolver;
use crate::pagination::{paginate, PageInfo, PageResult};
use crate::repository::EventRepository;

/// Response body of the historical query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEventPage {
    pub items: Vec<NavEvent>,
    pub pagination: PageInfo,
}

impl From<PageResult<NavEvent>> for NavEventPage {
    fn from(page: PageResult<NavEvent>) -> Self {
        let pagination = page.info();
        Self {
            items: page.items,
            pagination,
        }
    }
}

/// Response body of the latest query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestNavEvents {
    pub items: Vec<NavEvent>,
}

/// Read-only NAV query service.
///
/// Holds immutable configuration and a shared repository, so one instance
/// can serve any number of concurrent requests.
pub struct NavQueryService<R: ?Sized> {
    config: NavQueryConfig,
    repository: Arc<R>,
}

impl<R: ?Sized> Clone for NavQueryService<R> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: EventRepository> NavQueryService<R> {
    pub fn new(repository: R) -> Self {
        Self::with_config(Arc::new(repository), NavQueryConfig::default())
    }
}

impl<R> NavQueryService<R>
where
    R: EventRepository + ?Sized,
{
    pub fn with_config(repository: Arc<R>, config: NavQueryConfig) -> Self {
        Self { config, repository }
    }

    pub fn config(&self) -> &NavQueryConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Historical events for one key, oldest first, paginated.
    pub async fn get_nav_events(
        &self,
        request: &NavEventRequest,
    ) -> Result<PageResult<NavEvent>, QueryError> {
        let spec = validate(request, &self.config.limits)?;
        tracing::debug!(
            key = %spec.key(),
            price_denoms = spec.price_denoms().len(),
            page = spec.page(),
            page_size = spec.page_size(),
            "resolving nav events"
        );

        let events = self
            .within_deadline("scan", async {
                self.repository.scan(&spec).await.map_err(QueryError::from)
            })
            .await?;
        check_scan_contract(&spec, &events)?;

        let page = paginate(events, spec.page(), spec.page_size());
        tracing::debug!(
            key = %spec.key(),
            total_items = page.total_items,
            returned = page.items.len(),
            "nav events resolved"
        );
        Ok(page)
    }

    /// Newest event per grouping key, unpaginated.
    pub async fn get_latest_nav_events(
        &self,
        request: &LatestNavEventRequest,
    ) -> Result<Vec<NavEvent>, QueryError> {
        let spec = validate_latest(request)?;
        tracing::debug!(
            include_markers = spec.include_markers(),
            include_scopes = spec.include_scopes(),
            price_denoms = spec.price_denoms().len(),
            "resolving latest nav events"
        );

        let resolver = LatestResolver::new(self.repository.as_ref());
        let latest = self.within_deadline("latest", resolver.resolve(&spec)).await?;
        tracing::debug!(keys = latest.len(), "latest nav events resolved");
        Ok(latest)
    }

    /// [`get_nav_events`](Self::get_nav_events) shaped as the response body.
    pub async fn nav_event_page(
        &self,
        request: &NavEventRequest,
    ) -> Result<NavEventPage, QueryError> {
        self.get_nav_events(request).await.map(NavEventPage::from)
    }

    /// [`get_latest_nav_events`](Self::get_latest_nav_events) shaped as the
    /// response body.
    pub async fn latest_nav_events(
        &self,
        request: &LatestNavEventRequest,
    ) -> Result<LatestNavEvents, QueryError> {
        let items = self.get_latest_nav_events(request).await?;
        Ok(LatestNavEvents { items })
    }

    async fn within_deadline<T, F>(&self, operation: &'static str, future: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, QueryError>>,
    {
        let Some(limit) = self.config.query_timeout() else {
            return future.await;
        };

        match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "query timed out");
                Err(QueryError::RepositoryUnavailable(format!(
                    "{operation} timed out after {} ms",
                    limit.as_millis()
                )))
            }
        }
    }
}

fn check_scan_contract(spec: &QuerySpec, events: &[NavEvent]) -> Result<(), QueryError> {
    if let Some(stray) = events.iter().find(|event| !spec.matches(event)) {
        let message = format!(
            "scan for {} returned non-matching event at height {}",
            spec.key(),
            stray.block_height
        );
        tracing::warn!(%message, "repository contract violation");
        return Err(QueryError::Internal(message));
    }

    let ordered = events
        .windows(2)
        .all(|pair| pair[0].ordering_key() <= pair[1].ordering_key());
    if !ordered {
        let message = format!("scan for {} returned events out of order", spec.key());
        tracing::warn!(%message, "repository contract violation");
        return Err(QueryError::Internal(message));
    }

    Ok(())
}
