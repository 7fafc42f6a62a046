use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use validator::Validate;

use super::{broadcast_change, select_records};
use crate::dto::{CreateFullChargeRequest, RecordsQuery};
use crate::error::{AppError, AppResult};
use crate::models::FullChargeEntry;
use crate::AppState;

pub async fn create_full_charge(
    State(state): State<AppState>,
    Json(body): Json<CreateFullChargeRequest>,
) -> AppResult<(StatusCode, Json<FullChargeEntry>)> {
    body.validate()?;
    let at = body.timestamp(Utc::now()).map_err(AppError::Validation)?;
    let entry = FullChargeEntry::new(body.source, at);

    state.gateway.save(&entry).await?;
    broadcast_change(&state, "fullCharge", &entry.id);
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_full_charges(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> AppResult<Json<Vec<FullChargeEntry>>> {
    let entries = select_records::<FullChargeEntry>(&state, &query).await?;
    Ok(Json(entries))
}
