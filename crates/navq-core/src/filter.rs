//! Request types and the filter validator.
//!
//! Raw requests carry optional strings and signed integers the way an RPC
//! layer hands them over. [`validate`] and [`validate_latest`] turn them into
//! the canonical [`QuerySpec`] / [`LatestQuerySpec`], which can only be built
//! here and are therefore always well-formed.

use serde::{Deserialize, Serialize};
use time::macros::{format_description, time};
use time::{Date, PrimitiveDateTime, Time};

use crate::config::QueryLimits;
use crate::domain::{NavEvent, NavKey, PriceDenomSet, UtcDateTime};
use crate::error::ValidationError;

/// Page selection as supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationRequest {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

/// Historical query request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEventRequest {
    #[serde(default)]
    pub denom: Option<String>,
    #[serde(default)]
    pub scope_id: Option<String>,
    #[serde(default)]
    pub price_denoms: Vec<String>,
    #[serde(default)]
    pub from_date: Option<String>,
    #[serde(default)]
    pub to_date: Option<String>,
    /// Restrict to events reported by this data source.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub pagination: Option<PaginationRequest>,
}

impl NavEventRequest {
    pub fn for_denom(denom: impl Into<String>) -> Self {
        Self {
            denom: Some(denom.into()),
            ..Self::default()
        }
    }

    pub fn for_scope(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: Some(scope_id.into()),
            ..Self::default()
        }
    }
}

/// Latest-per-key query request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestNavEventRequest {
    #[serde(default)]
    pub price_denoms: Vec<String>,
    #[serde(default)]
    pub include_markers: bool,
    #[serde(default)]
    pub include_scopes: bool,
    #[serde(default)]
    pub from_date: Option<String>,
}

/// Canonical historical query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    key: NavKey,
    price_denoms: PriceDenomSet,
    from: Option<UtcDateTime>,
    to: Option<UtcDateTime>,
    data_source: Option<String>,
    page: u32,
    page_size: u32,
}

impl QuerySpec {
    pub fn key(&self) -> &NavKey {
        &self.key
    }

    pub fn price_denoms(&self) -> &PriceDenomSet {
        &self.price_denoms
    }

    /// Inclusive lower bound.
    pub fn from(&self) -> Option<UtcDateTime> {
        self.from
    }

    /// Inclusive upper bound.
    pub fn to(&self) -> Option<UtcDateTime> {
        self.to
    }

    pub fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Whether `event` satisfies every filter of this query.
    pub fn matches(&self, event: &NavEvent) -> bool {
        event.key == self.key
            && self.price_denoms.allows(&event.price_denom)
            && self.from.map_or(true, |from| event.event_time >= from)
            && self.to.map_or(true, |to| event.event_time <= to)
            && self
                .data_source
                .as_deref()
                .map_or(true, |source| event.data_source == source)
    }
}

/// Canonical latest query. At least one inclusion flag is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestQuerySpec {
    price_denoms: PriceDenomSet,
    include_markers: bool,
    include_scopes: bool,
    from: Option<UtcDateTime>,
}

impl LatestQuerySpec {
    pub fn price_denoms(&self) -> &PriceDenomSet {
        &self.price_denoms
    }

    pub fn include_markers(&self) -> bool {
        self.include_markers
    }

    pub fn include_scopes(&self) -> bool {
        self.include_scopes
    }

    /// Inclusive lower bound.
    pub fn from(&self) -> Option<UtcDateTime> {
        self.from
    }

    /// Whether keys of this kind are part of the candidate universe.
    pub fn includes(&self, key: &NavKey) -> bool {
        match key {
            NavKey::Denom(_) => self.include_markers,
            NavKey::Scope(_) => self.include_scopes,
        }
    }

    /// Whether `event` may be reported as the latest for its key.
    pub fn admits(&self, event: &NavEvent) -> bool {
        self.includes(&event.key)
            && self.price_denoms.allows(&event.price_denom)
            && self.from.map_or(true, |from| event.event_time >= from)
    }
}

/// Validate and normalize a historical request.
pub fn validate(
    request: &NavEventRequest,
    limits: &QueryLimits,
) -> Result<QuerySpec, ValidationError> {
    let key = match (non_blank(&request.denom), non_blank(&request.scope_id)) {
        (Some(denom), None) => NavKey::Denom(denom.to_owned()),
        (None, Some(scope_id)) => NavKey::Scope(scope_id.to_owned()),
        (Some(_), Some(_)) => {
            return Err(ValidationError::MissingKey {
                field: "denom/scope_id",
                reason: "only one of denom or scope_id may be set",
            })
        }
        (None, None) => {
            return Err(ValidationError::MissingKey {
                field: "denom/scope_id",
                reason: "one of denom or scope_id is required",
            })
        }
    };

    let from = parse_date_bound("from_date", request.from_date.as_deref(), DayEdge::Start)?;
    let to = parse_date_bound("to_date", request.to_date.as_deref(), DayEdge::End)?;
    if let (Some(from_value), Some(to_value)) = (from, to) {
        if from_value > to_value {
            return Err(ValidationError::InvalidDateRange {
                from: request.from_date.clone().unwrap_or_default(),
                to: request.to_date.clone().unwrap_or_default(),
            });
        }
    }

    let pagination = request.pagination.unwrap_or_default();
    let page = match pagination.page {
        None => 1,
        Some(page) if page >= 1 => u32::try_from(page).unwrap_or(u32::MAX),
        Some(page) => {
            return Err(ValidationError::InvalidPagination {
                field: "page",
                value: page,
                max: u32::MAX,
            })
        }
    };
    let page_size = match pagination.page_size {
        None => limits.default_page_size,
        Some(size) if size >= 1 && size <= i64::from(limits.max_page_size) => {
            u32::try_from(size).unwrap_or(limits.max_page_size)
        }
        Some(size) => {
            return Err(ValidationError::InvalidPagination {
                field: "page_size",
                value: size,
                max: limits.max_page_size,
            })
        }
    };

    Ok(QuerySpec {
        key,
        price_denoms: PriceDenomSet::new(request.price_denoms.iter().cloned()),
        from,
        to,
        data_source: non_blank(&request.source).map(str::to_owned),
        page,
        page_size,
    })
}

/// Validate and normalize a latest-per-key request.
pub fn validate_latest(
    request: &LatestNavEventRequest,
) -> Result<LatestQuerySpec, ValidationError> {
    if !request.include_markers && !request.include_scopes {
        return Err(ValidationError::MissingKey {
            field: "include_markers/include_scopes",
            reason: "at least one of include_markers or include_scopes must be true",
        });
    }

    Ok(LatestQuerySpec {
        price_denoms: PriceDenomSet::new(request.price_denoms.iter().cloned()),
        include_markers: request.include_markers,
        include_scopes: request.include_scopes,
        from: parse_date_bound("from_date", request.from_date.as_deref(), DayEdge::Start)?,
    })
}

#[derive(Debug, Clone, Copy)]
enum DayEdge {
    Start,
    End,
}

const LAST_INSTANT_OF_DAY: Time = time!(23:59:59.999999999);

/// Parse `YYYY-MM-DD`, RFC3339, or an ISO-8601 date-time without offset
/// (read as UTC). A bare date resolves to the first or last instant of that
/// UTC day depending on `edge`.
fn parse_date_bound(
    field: &'static str,
    raw: Option<&str>,
    edge: DayEdge,
) -> Result<Option<UtcDateTime>, ValidationError> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    if let Ok(instant) = UtcDateTime::parse(value) {
        return Ok(Some(instant));
    }
    if let Some(local) = parse_local_date_time(value) {
        return Ok(Some(UtcDateTime::from_offset_datetime(local.assume_utc())));
    }

    let date = Date::parse(value, format_description!("[year]-[month]-[day]")).map_err(|_| {
        ValidationError::InvalidDateFormat {
            field,
            value: value.to_owned(),
        }
    })?;
    let time_of_day = match edge {
        DayEdge::Start => Time::MIDNIGHT,
        DayEdge::End => LAST_INSTANT_OF_DAY,
    };

    Ok(Some(UtcDateTime::from_offset_datetime(
        PrimitiveDateTime::new(date, time_of_day).assume_utc(),
    )))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

fn parse_local_date_time(value: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        )
    })
    .ok()
}
