use std::time::Instant;

use navq_core::{LatestNavEventRequest, NavQueryService, WarehouseRepository};

use crate::cli::LatestArgs;
use crate::error::CliError;

use super::{elapsed_ms, CommandResult};

pub async fn run(
    args: &LatestArgs,
    service: &NavQueryService<WarehouseRepository>,
) -> Result<CommandResult, CliError> {
    let request = LatestNavEventRequest {
        price_denoms: args.price_denoms.clone(),
        include_markers: args.markers,
        include_scopes: args.scopes,
        from_date: args.from_date.clone(),
    };

    let started = Instant::now();
    let latest = service.latest_nav_events(&request).await?;
    let latency_ms = elapsed_ms(started);

    Ok(CommandResult::ok(serde_json::to_value(&latest)?).with_latency(latency_ms))
}
