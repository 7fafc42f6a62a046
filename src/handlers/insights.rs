use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::dto::{InsightResponse, InsightsQuery};
use crate::error::AppResult;
use crate::models::{DateKey, FullChargeEntry, JournalEntry};
use crate::services::insights::{analyze, InsightWindow};
use crate::services::steps::fetch_steps_best_effort;
use crate::AppState;

/// Insight report over the last `days` days, today included.
pub async fn get_insights(
    State(state): State<AppState>,
    Query(query): Query<InsightsQuery>,
) -> AppResult<Json<InsightResponse>> {
    query.validate()?;
    let days = query.days.unwrap_or(state.config.insight_window_days).max(1);

    let end = DateKey::from_timestamp(Utc::now());
    let start = end.add_days(1 - days);
    let (from, to) = (start.start_utc(), end.end_utc());

    let (entries, full_charges, steps) = tokio::join!(
        state.gateway.in_range::<JournalEntry>(from, to),
        state.gateway.in_range::<FullChargeEntry>(from, to),
        fetch_steps_best_effort(state.steps.as_ref(), start, end),
    );
    let entries = entries?;
    let full_charges = full_charges?;

    let report = analyze(InsightWindow {
        entries: &entries,
        full_charges: &full_charges,
        steps: steps.as_ref(),
    });
    tracing::info!(
        days,
        entries = report.entry_count,
        full_charges = report.full_charge_count,
        steps_available = steps.is_some(),
        "Insight report generated"
    );

    Ok(Json(InsightResponse {
        start,
        end,
        steps_available: steps.is_some(),
        report,
    }))
}
