use axum::{
    extract::{Query, State},
    Json,
};

use crate::dto::CalendarQuery;
use crate::error::{AppError, AppResult};
use crate::models::{FullChargeEntry, JournalEntry};
use crate::services::grouping::{calendar_days, DayIndicator};
use crate::AppState;

pub async fn month_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<Vec<DayIndicator>>> {
    let (first, last) = query.month_bounds().map_err(AppError::Validation)?;
    let (start, end) = (first.start_utc(), last.end_utc());

    let (entries, full_charges) = tokio::join!(
        state.gateway.in_range::<JournalEntry>(start, end),
        state.gateway.in_range::<FullChargeEntry>(start, end),
    );
    Ok(Json(calendar_days(&entries?, &full_charges?)))
}
