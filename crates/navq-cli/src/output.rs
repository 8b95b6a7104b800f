use navq_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => render_table(envelope)?,
    }

    Ok(())
}

fn render_table(envelope: &Envelope<Value>) -> Result<(), CliError> {
    println!("request_id  : {}", envelope.meta.request_id);
    println!("schema      : {}", envelope.meta.schema_version);
    println!("generated_at: {}", envelope.meta.generated_at);
    println!("latency_ms  : {}", envelope.meta.latency_ms);

    if !envelope.meta.warnings.is_empty() {
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    match envelope.data.get("items").and_then(Value::as_array) {
        Some(items) => render_events(items),
        None => {
            println!("data:");
            let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
            for line in pretty_data.lines() {
                println!("  {line}");
            }
        }
    }

    if let Some(pagination) = envelope.data.get("pagination") {
        println!(
            "page {} of {} ({} events)",
            pagination["current_page"], pagination["total_pages"], pagination["total_items"]
        );
    }

    if !envelope.errors.is_empty() {
        println!("errors:");
        for error in &envelope.errors {
            println!("  - {}: {}", error.code, error.message);
        }
    }

    Ok(())
}

fn render_events(items: &[Value]) {
    println!(
        "{:<8} {:<32} {:<22} {:>12} {:<8} {:>10} {:>12}",
        "source", "key", "event_time", "amount", "denom", "height", "usd/unit"
    );
    for item in items {
        println!("{}", event_row(item));
    }
}

fn event_row(item: &Value) -> String {
    let key = item
        .get("denom")
        .or_else(|| item.get("scope_id"))
        .and_then(Value::as_str)
        .unwrap_or("-");
    let per_unit = item
        .get("usd_price_per_unit")
        .and_then(Value::as_f64)
        .map_or_else(|| "-".to_string(), |price| format!("{price:.3}"));
    format!(
        "{:<8} {:<32} {:<22} {:>12} {:<8} {:>10} {:>12}",
        item["source"].as_str().unwrap_or("-"),
        key,
        item["event_time"].as_str().unwrap_or("-"),
        item["price_amount"].to_string(),
        item["price_denom"].as_str().unwrap_or("-"),
        item["block_height"].to_string(),
        per_unit,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use navq_core::{NavEvent, NavKey, UtcDateTime};

    #[test]
    fn event_rows_show_usd_price_per_unit() {
        let time = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid time");
        let usd = NavEvent::new(NavKey::Denom("nhash".into()), "usd", 1234, time, 7)
            .expect("valid event");
        let row = event_row(&serde_json::to_value(&usd).expect("serialize"));
        assert!(row.starts_with("marker"));
        assert!(row.ends_with("1.234"));

        let other = NavEvent::new(NavKey::Scope("scope1".into()), "nhash", 10, time, 8)
            .expect("valid event");
        let row = event_row(&serde_json::to_value(&other).expect("serialize"));
        assert!(row.trim_end().ends_with('-'));
    }
}
