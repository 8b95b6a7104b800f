//! # Domain Models
//!
//! NAV event types shared by the validator, the repositories and the
//! service.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`NavEvent`] | One observed NAV data point |
//! | [`NavKey`] | Grouping key: denom or scope id |
//! | [`NavSource`] | Marker or scope, derived from the key |
//! | [`PriceDenomSet`] | Ordered, de-duplicated price denom filter |
//! | [`UtcDateTime`] | UTC instant |
//!
//! A `NavEvent` can only carry one key, so the "exactly one of denom or
//! scope id" rule holds by construction. The JSON form splits the key back
//! into `denom` / `scope_id` and rejects inputs that set both, neither, or a
//! `source` that disagrees with the key:
//!
//! ```rust
//! use navq_core::{NavEvent, NavSource};
//!
//! let json = r#"{"denom":"nhash","price_denom":"usd","price_amount":1234,
//!     "event_time":"2024-01-01T00:00:00Z","block_height":7}"#;
//! let event: NavEvent = serde_json::from_str(json).unwrap();
//! assert_eq!(event.source(), NavSource::Marker);
//! assert_eq!(event.usd_price_per_unit(), Some(1.234));
//! ```

mod event;
mod price_denom;
mod timestamp;

pub use event::{NavEvent, NavKey, NavSource};
pub use price_denom::PriceDenomSet;
pub use timestamp::UtcDateTime;
