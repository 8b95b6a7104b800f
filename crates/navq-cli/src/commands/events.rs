use std::time::Instant;

use navq_core::{NavEventRequest, NavQueryService, PaginationRequest, WarehouseRepository};

use crate::cli::EventsArgs;
use crate::error::CliError;

use super::{elapsed_ms, CommandResult};

pub async fn run(
    args: &EventsArgs,
    service: &NavQueryService<WarehouseRepository>,
) -> Result<CommandResult, CliError> {
    let request = NavEventRequest {
        denom: args.denom.clone(),
        scope_id: args.scope_id.clone(),
        price_denoms: args.price_denoms.clone(),
        from_date: args.from_date.clone(),
        to_date: args.to_date.clone(),
        source: args.source.clone(),
        pagination: (args.page.is_some() || args.page_size.is_some()).then_some(
            PaginationRequest {
                page: args.page,
                page_size: args.page_size,
            },
        ),
    };

    let started = Instant::now();
    let page = service.nav_event_page(&request).await?;
    let latency_ms = elapsed_ms(started);

    let past_end = page.items.is_empty() && page.pagination.current_page > page.pagination.total_pages;
    let mut result = CommandResult::ok(serde_json::to_value(&page)?).with_latency(latency_ms);
    if past_end {
        result = result.with_warning(format!(
            "page {} is past the last page ({})",
            page.pagination.current_page, page.pagination.total_pages
        ));
    }

    Ok(result)
}
