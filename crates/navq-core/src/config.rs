//! Query configuration.
//!
//! Values come from [`Default`] or from the process environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `NAVQ_DEFAULT_PAGE_SIZE` | 50 |
//! | `NAVQ_MAX_PAGE_SIZE` | 1000 |
//! | `NAVQ_QUERY_TIMEOUT_MS` | unset (no timeout) |

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Pagination limits applied by the filter validator.
///
/// Deserialization goes through [`QueryLimits::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQueryLimits")]
pub struct QueryLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Deserialize)]
struct RawQueryLimits {
    default_page_size: u32,
    max_page_size: u32,
}

impl TryFrom<RawQueryLimits> for QueryLimits {
    type Error = ConfigError;

    fn try_from(raw: RawQueryLimits) -> Result<Self, Self::Error> {
        Self::new(raw.default_page_size, raw.max_page_size)
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl QueryLimits {
    pub fn new(default_page_size: u32, max_page_size: u32) -> Result<Self, ConfigError> {
        if default_page_size == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "default_page_size",
                value: default_page_size.to_string(),
            });
        }
        if max_page_size == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "max_page_size",
                value: max_page_size.to_string(),
            });
        }
        if default_page_size > max_page_size {
            return Err(ConfigError::DefaultExceedsMax {
                default: default_page_size,
                max: max_page_size,
            });
        }

        Ok(Self {
            default_page_size,
            max_page_size,
        })
    }
}

/// Service-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavQueryConfig {
    pub limits: QueryLimits,
    /// Per-call deadline for repository work. `None` waits indefinitely.
    pub query_timeout_ms: Option<u64>,
}

impl NavQueryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = QueryLimits::default();
        let default_page_size = read_u32("NAVQ_DEFAULT_PAGE_SIZE")?
            .unwrap_or(defaults.default_page_size);
        let max_page_size = read_u32("NAVQ_MAX_PAGE_SIZE")?.unwrap_or(defaults.max_page_size);
        let query_timeout_ms = read_u64("NAVQ_QUERY_TIMEOUT_MS")?;

        Ok(Self {
            limits: QueryLimits::new(default_page_size, max_page_size)?,
            query_timeout_ms,
        })
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

fn read_u32(name: &'static str) -> Result<Option<u32>, ConfigError> {
    read_u64(name)?
        .map(|value| {
            u32::try_from(value).map_err(|_| ConfigError::InvalidNumber {
                name,
                value: value.to_string(),
            })
        })
        .transpose()
}

fn read_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(None);
    };
    parse_positive(name, &raw)
}

fn parse_positive(name: &'static str, raw: &str) -> Result<Option<u64>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_owned(),
        }),
    }
}
