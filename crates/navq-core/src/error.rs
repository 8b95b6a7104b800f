use thiserror::Error;

/// Request validation errors. Each variant names the offending field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing key '{field}': {reason}")]
    MissingKey {
        field: &'static str,
        reason: &'static str,
    },

    #[error("invalid date range: from_date '{from}' is after to_date '{to}'")]
    InvalidDateRange { from: String, to: String },

    #[error("field '{field}' must be YYYY-MM-DD or an RFC3339 date-time: '{value}'")]
    InvalidDateFormat { field: &'static str, value: String },

    #[error("field '{field}' must be between 1 and {max}, got {value}")]
    InvalidPagination {
        field: &'static str,
        value: i64,
        max: u32,
    },
}

impl ValidationError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingKey { .. } => "query.missing_key",
            Self::InvalidDateRange { .. } => "query.invalid_date_range",
            Self::InvalidDateFormat { .. } => "query.invalid_date_format",
            Self::InvalidPagination { .. } => "query.invalid_pagination",
        }
    }

    /// Request field the error refers to.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingKey { field, .. }
            | Self::InvalidDateFormat { field, .. }
            | Self::InvalidPagination { field, .. } => field,
            Self::InvalidDateRange { .. } => "from_date",
        }
    }
}

/// Violations of the NAV event model found while building or decoding events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("event must carry exactly one of denom or scope_id, found both")]
    AmbiguousKey,
    #[error("event must carry exactly one of denom or scope_id, found neither")]
    MissingKey,
    #[error("event source '{source_kind}' does not match its {key_kind} key")]
    SourceMismatch {
        source_kind: &'static str,
        key_kind: &'static str,
    },
    #[error("event price_denom cannot be empty")]
    EmptyPriceDenom,
    #[error("timestamp out of range: {value}")]
    TimestampOutOfRange { value: i64 },
    #[error("timestamp must be RFC3339: '{value}'")]
    InvalidTimestamp { value: String },
}

/// Configuration errors raised while reading limits from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("default page size {default} exceeds max page size {max}")]
    DefaultExceedsMax { default: u32, max: u32 },
}

/// Errors returned by query operations.
///
/// Operations are all-or-nothing: no partial results accompany an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("event repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(error) => error.code(),
            Self::RepositoryUnavailable(_) => "query.repository_unavailable",
            Self::Internal(_) => "query.internal",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    pub const fn retryable(&self) -> bool {
        matches!(self, Self::RepositoryUnavailable(_))
    }
}
