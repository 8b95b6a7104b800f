//! Decoding of chain transaction events into NAV rows.
//!
//! A transaction carries an ordered list of typed events with string
//! attributes. Marker NAV updates arrive as `EventSetNetAssetValue` events:
//!
//! | Attribute | Example | Required |
//! |-----------|---------|----------|
//! | `denom` | `"nhash"` | yes |
//! | `price` | `"1234usd"` | yes |
//! | `volume` | `"1000"` | yes |
//! | `source` | `"x/exchange market 1"` | no |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{parse_price, NavEventRecord};

/// Event type of a marker NAV update.
pub const SET_NAV_EVENT_TYPE: &str = "provenance.marker.v1.EventSetNetAssetValue";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAttribute {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub attributes: Vec<ChainAttribute>,
}

/// One transaction with its block placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTx {
    pub block_height: i64,
    pub block_time_micros: i64,
    pub tx_hash: String,
    pub events: Vec<ChainEvent>,
}

/// Rows decoded from a transaction plus the NAV events that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedNavEvents {
    pub records: Vec<NavEventRecord>,
    pub skipped: usize,
}

/// Decode every `EventSetNetAssetValue` event of `tx`.
///
/// `event_order` is the event's index among all events of the transaction.
/// NAV events without a denom, an integer volume or a parseable price are
/// counted in `skipped`; other event types are ignored.
pub fn decode_set_nav_events(tx: &ChainTx) -> DecodedNavEvents {
    let mut decoded = DecodedNavEvents::default();

    for (index, event) in tx.events.iter().enumerate() {
        if event.event_type != SET_NAV_EVENT_TYPE {
            continue;
        }
        match decode_event(tx, index, event) {
            Some(record) => decoded.records.push(record),
            None => {
                tracing::debug!(
                    tx_hash = %tx.tx_hash,
                    event_order = index,
                    "skipping incomplete nav event"
                );
                decoded.skipped += 1;
            }
        }
    }

    decoded
}

fn decode_event(tx: &ChainTx, index: usize, event: &ChainEvent) -> Option<NavEventRecord> {
    let attributes: HashMap<&str, &str> = event
        .attributes
        .iter()
        .map(|attribute| (attribute.key.as_str(), attribute.value.trim_matches('"')))
        .collect();

    let denom = attributes
        .get("denom")
        .filter(|denom| !denom.trim().is_empty())?;
    let volume = attributes.get("volume")?.trim().parse::<i64>().ok()?;
    let (price_amount, price_denom) = parse_price(attributes.get("price")?)?;
    let source = attributes.get("source").copied().unwrap_or_default();

    Some(NavEventRecord {
        block_height: tx.block_height,
        block_time_micros: tx.block_time_micros,
        tx_hash: tx.tx_hash.clone(),
        event_order: i32::try_from(index).ok()?,
        event_type: event.event_type.clone(),
        scope_id: None,
        denom: Some((*denom).to_string()),
        price_amount,
        price_denom,
        volume,
        source: source.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(key: &str, value: &str) -> ChainAttribute {
        ChainAttribute {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn set_nav(denom: &str, price: &str, volume: &str) -> ChainEvent {
        ChainEvent {
            event_type: SET_NAV_EVENT_TYPE.to_string(),
            attributes: vec![
                attribute("denom", &format!("\"{denom}\"")),
                attribute("price", &format!("\"{price}\"")),
                attribute("volume", &format!("\"{volume}\"")),
                attribute("source", "\"x/exchange market 1\""),
            ],
        }
    }

    fn tx(events: Vec<ChainEvent>) -> ChainTx {
        ChainTx {
            block_height: 17_000_000,
            block_time_micros: 1_700_000_000_000_000,
            tx_hash: "C4EF515F".to_string(),
            events,
        }
    }

    #[test]
    fn decodes_marker_navs_in_event_order() {
        let transfer = ChainEvent {
            event_type: "transfer".to_string(),
            attributes: vec![attribute("amount", "5nhash")],
        };
        let decoded = decode_set_nav_events(&tx(vec![
            transfer,
            set_nav("neth.figure.se", "2513160000uusd.trading", "1000000000"),
            set_nav("nbtc.figure.se", "1688067490uusd.trading", "25400000"),
        ]));

        assert_eq!(decoded.skipped, 0);
        assert_eq!(decoded.records.len(), 2);
        let eth = &decoded.records[0];
        assert_eq!(eth.denom.as_deref(), Some("neth.figure.se"));
        assert_eq!(eth.price_amount, 2_513_160_000);
        assert_eq!(eth.price_denom, "uusd.trading");
        assert_eq!(eth.volume, 1_000_000_000);
        assert_eq!(eth.source, "x/exchange market 1");
        assert_eq!(eth.event_order, 1);
        assert_eq!(eth.block_height, 17_000_000);
        assert_eq!(decoded.records[1].event_order, 2);
        assert_eq!(decoded.records[1].volume, 25_400_000);
    }

    #[test]
    fn skips_navs_missing_denom_volume_or_price() {
        let mut no_denom = set_nav("nhash", "10usd", "1");
        no_denom.attributes.retain(|attribute| attribute.key != "denom");

        let decoded = decode_set_nav_events(&tx(vec![
            no_denom,
            set_nav("nhash", "10usd", "many"),
            set_nav("nhash", "usd", "1"),
            set_nav("nhash", "10usd", "1"),
        ]));

        assert_eq!(decoded.skipped, 3);
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].event_order, 3);
    }

    #[test]
    fn missing_source_is_stored_empty() {
        let mut event = set_nav("nhash", "10usd", "1");
        event.attributes.retain(|attribute| attribute.key != "source");

        let decoded = decode_set_nav_events(&tx(vec![event]));
        assert_eq!(decoded.records[0].source, "");
    }
}
