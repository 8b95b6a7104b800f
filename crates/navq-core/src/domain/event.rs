use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::domain::UtcDateTime;
use crate::error::EventError;

const USD: &str = "usd";

/// Kind of asset that reported a NAV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavSource {
    Marker,
    Scope,
}

impl NavSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Scope => "scope",
        }
    }
}

impl Display for NavSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping key of a NAV event: a token denomination or a scope id.
///
/// The derived ordering puts every denom before every scope, each group
/// ascending by string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NavKey {
    Denom(String),
    Scope(String),
}

impl NavKey {
    pub const fn source(&self) -> NavSource {
        match self {
            Self::Denom(_) => NavSource::Marker,
            Self::Scope(_) => NavSource::Scope,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Denom(value) | Self::Scope(value) => value,
        }
    }

    pub fn denom(&self) -> Option<&str> {
        match self {
            Self::Denom(value) => Some(value),
            Self::Scope(_) => None,
        }
    }

    pub fn scope_id(&self) -> Option<&str> {
        match self {
            Self::Scope(value) => Some(value),
            Self::Denom(_) => None,
        }
    }

    /// Build a key from an optional denom / scope id pair; exactly one must be
    /// set.
    pub fn from_parts(
        denom: Option<String>,
        scope_id: Option<String>,
    ) -> Result<Self, EventError> {
        match (denom, scope_id) {
            (Some(denom), None) => Ok(Self::Denom(denom)),
            (None, Some(scope_id)) => Ok(Self::Scope(scope_id)),
            (Some(_), Some(_)) => Err(EventError::AmbiguousKey),
            (None, None) => Err(EventError::MissingKey),
        }
    }
}

impl Display for NavKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denom(value) => write!(f, "denom:{value}"),
            Self::Scope(value) => write!(f, "scope:{value}"),
        }
    }
}

/// One observed net-asset-value data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NavEventWire", into = "NavEventWire")]
pub struct NavEvent {
    pub key: NavKey,
    pub price_denom: String,
    /// Scaled amount; for `usd` the unit is a thousandth of a dollar.
    pub price_amount: i64,
    pub volume: i64,
    pub event_time: UtcDateTime,
    pub block_height: i64,
    pub event_order: i32,
    pub tx_hash: String,
    pub event_type: String,
    pub data_source: String,
}

impl NavEvent {
    pub fn new(
        key: NavKey,
        price_denom: impl Into<String>,
        price_amount: i64,
        event_time: UtcDateTime,
        block_height: i64,
    ) -> Result<Self, EventError> {
        let price_denom = price_denom.into();
        if price_denom.trim().is_empty() {
            return Err(EventError::EmptyPriceDenom);
        }

        Ok(Self {
            key,
            price_denom,
            price_amount,
            volume: 1,
            event_time,
            block_height,
            event_order: 0,
            tx_hash: String::new(),
            event_type: String::new(),
            data_source: String::new(),
        })
    }

    pub fn with_volume(mut self, volume: i64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_event_order(mut self, event_order: i32) -> Self {
        self.event_order = event_order;
        self
    }

    pub fn with_provenance(
        mut self,
        tx_hash: impl Into<String>,
        event_type: impl Into<String>,
        data_source: impl Into<String>,
    ) -> Self {
        self.tx_hash = tx_hash.into();
        self.event_type = event_type.into();
        self.data_source = data_source.into();
        self
    }

    pub const fn source(&self) -> NavSource {
        self.key.source()
    }

    /// Total ordering key: time, then block height, then position in block.
    pub fn ordering_key(&self) -> (UtcDateTime, i64, i32) {
        (self.event_time, self.block_height, self.event_order)
    }

    /// Dollar price of one unit, truncated to three decimals.
    ///
    /// `None` unless the price is in `usd` and the volume is non-zero.
    pub fn usd_price_per_unit(&self) -> Option<f64> {
        if self.price_denom != USD {
            return None;
        }
        let millis = self.price_amount.checked_div(self.volume)?;
        Some(millis as f64 / 1000.0)
    }
}

/// External representation with the key split into `denom` / `scope_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NavEventWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    denom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope_id: Option<String>,
    price_denom: String,
    price_amount: i64,
    #[serde(default = "default_volume")]
    volume: i64,
    event_time: UtcDateTime,
    #[serde(default)]
    source: Option<NavSource>,
    block_height: i64,
    #[serde(default)]
    event_order: i32,
    #[serde(default)]
    tx_hash: String,
    #[serde(default)]
    event_type: String,
    #[serde(default)]
    data_source: String,
    /// Derived on output; ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usd_price_per_unit: Option<f64>,
}

const fn default_volume() -> i64 {
    1
}

impl TryFrom<NavEventWire> for NavEvent {
    type Error = EventError;

    fn try_from(wire: NavEventWire) -> Result<Self, Self::Error> {
        let non_blank = |value: Option<String>| value.filter(|value| !value.trim().is_empty());
        let key = NavKey::from_parts(non_blank(wire.denom), non_blank(wire.scope_id))?;

        if let Some(source) = wire.source {
            if source != key.source() {
                return Err(EventError::SourceMismatch {
                    source_kind: source.as_str(),
                    key_kind: key.source().as_str(),
                });
            }
        }

        Ok(Self::new(
            key,
            wire.price_denom,
            wire.price_amount,
            wire.event_time,
            wire.block_height,
        )?
        .with_volume(wire.volume)
        .with_event_order(wire.event_order)
        .with_provenance(wire.tx_hash, wire.event_type, wire.data_source))
    }
}

impl From<NavEvent> for NavEventWire {
    fn from(event: NavEvent) -> Self {
        let source = event.source();
        let usd_price_per_unit = event.usd_price_per_unit();
        let (denom, scope_id) = match event.key {
            NavKey::Denom(denom) => (Some(denom), None),
            NavKey::Scope(scope_id) => (None, Some(scope_id)),
        };

        Self {
            denom,
            scope_id,
            price_denom: event.price_denom,
            price_amount: event.price_amount,
            volume: event.volume,
            event_time: event.event_time,
            source: Some(source),
            block_height: event.block_height,
            event_order: event.event_order,
            tx_hash: event.tx_hash,
            event_type: event.event_type,
            data_source: event.data_source,
            usd_price_per_unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd_event(price_amount: i64, volume: i64) -> NavEvent {
        let time = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid time");
        NavEvent::new(NavKey::Denom("nhash".into()), "usd", price_amount, time, 1)
            .expect("valid event")
            .with_volume(volume)
    }

    #[test]
    fn serializes_split_key_and_derived_source() {
        let time = UtcDateTime::parse("2024-03-01T12:00:00Z").expect("valid time");
        let event = NavEvent::new(NavKey::Scope("scope1q".into()), "usd", 1500, time, 42)
            .expect("valid event");

        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["scope_id"], "scope1q");
        assert_eq!(json["source"], "scope");
        assert!(json.get("denom").is_none());
        assert_eq!(json["event_time"], "2024-03-01T12:00:00Z");
        assert_eq!(json["usd_price_per_unit"], 1.5);
    }

    #[test]
    fn usd_price_per_unit_is_output_only() {
        let json = serde_json::to_value(usd_event(1234, 10)).expect("serialize");
        assert_eq!(json["usd_price_per_unit"], 0.123);

        let mut other = usd_event(1234, 1);
        other.price_denom = String::from("nhash");
        let json = serde_json::to_value(&other).expect("serialize");
        assert!(json.get("usd_price_per_unit").is_none());

        let input = r#"{"denom":"nhash","price_denom":"usd","price_amount":1234,
            "event_time":"2024-01-01T00:00:00Z","block_height":1,"usd_price_per_unit":99.0}"#;
        let event: NavEvent = serde_json::from_str(input).expect("deserialize");
        assert_eq!(event.usd_price_per_unit(), Some(1.234));
    }

    #[test]
    fn rejects_events_with_both_or_neither_key() {
        let both = r#"{"denom":"nhash","scope_id":"scope1","price_denom":"usd",
            "price_amount":1,"event_time":"2024-01-01T00:00:00Z","block_height":1}"#;
        let neither = r#"{"price_denom":"usd","price_amount":1,
            "event_time":"2024-01-01T00:00:00Z","block_height":1}"#;

        assert!(serde_json::from_str::<NavEvent>(both).is_err());
        assert!(serde_json::from_str::<NavEvent>(neither).is_err());
    }

    #[test]
    fn rejects_source_inconsistent_with_key() {
        let json = r#"{"denom":"nhash","source":"scope","price_denom":"usd",
            "price_amount":1,"event_time":"2024-01-01T00:00:00Z","block_height":1}"#;
        let error = serde_json::from_str::<NavEvent>(json).expect_err("must fail");
        assert!(error.to_string().contains("does not match"));
    }

    #[test]
    fn usd_price_per_unit_truncates_to_three_decimals() {
        assert_eq!(usd_event(1, 1).usd_price_per_unit(), Some(0.001));
        assert_eq!(usd_event(1234, 1).usd_price_per_unit(), Some(1.234));
        assert_eq!(usd_event(1234, 10).usd_price_per_unit(), Some(0.123));
        assert_eq!(usd_event(1234, 0).usd_price_per_unit(), None);

        let mut other = usd_event(1234, 1);
        other.price_denom = String::from("nhash");
        assert_eq!(other.usd_price_per_unit(), None);
    }

    #[test]
    fn keys_order_denoms_before_scopes() {
        let mut keys = vec![
            NavKey::Scope("a".into()),
            NavKey::Denom("z".into()),
            NavKey::Denom("b".into()),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                NavKey::Denom("b".into()),
                NavKey::Denom("z".into()),
                NavKey::Scope("a".into()),
            ]
        );
    }
}
