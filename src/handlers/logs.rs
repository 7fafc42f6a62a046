use axum::{
    extract::{Query, State},
    Json,
};

use crate::dto::{LogItemResponse, LogsQuery};
use crate::error::AppResult;
use crate::models::{timeline, FullChargeEntry, JournalEntry, SortOrder};
use crate::AppState;

/// Journal entries and full charges merged into one timeline.
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> AppResult<Json<Vec<LogItemResponse>>> {
    let limit = query.limit.unwrap_or(state.config.recent_limit);

    let (entries, full_charges) = tokio::join!(
        state.gateway.recent::<JournalEntry>(limit),
        state.gateway.recent::<FullChargeEntry>(limit),
    );
    let entries = entries?;
    let full_charges = full_charges?;
    tracing::debug!(entries = entries.len(), full_charges = full_charges.len(), "Building log timeline");

    // Trimming must see newest-first order, whatever the requested order.
    let mut items = timeline(entries, full_charges, SortOrder::Desc);
    items.truncate(limit);
    if query.order == SortOrder::Asc {
        items.reverse();
    }
    Ok(Json(items.into_iter().map(LogItemResponse::from).collect()))
}
