use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use validator::Validate;

use super::{broadcast_change, select_records};
use crate::dto::{CancelResponse, CreateEntryRequest, DeleteResponse, RecordsQuery};
use crate::error::{AppError, AppResult};
use crate::models::{ActionType, DateKey, JournalEntry};
use crate::services::{DeleteOutcome, Notification};
use crate::AppState;

pub async fn create_entry(
    State(state): State<AppState>,
    Json(body): Json<CreateEntryRequest>,
) -> AppResult<(StatusCode, Json<JournalEntry>)> {
    body.validate()?;
    let now = Utc::now();
    let entry = body.into_entry(now).map_err(AppError::Validation)?;

    state.gateway.save(&entry).await?;

    if entry.action_type == ActionType::Rest {
        match entry.alarm_time {
            Some(at) if at > now => {
                state
                    .rest_timer
                    .schedule(&entry.id, at, Notification::rest_finished(&entry.next_task))
                    .await;
            }
            Some(at) => {
                tracing::debug!(entry_id = %entry.id, alarm_time = %at, "Alarm time already passed, not scheduling");
            }
            None => {}
        }
    }

    broadcast_change(&state, "journal", &entry.id);
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> AppResult<Json<Vec<JournalEntry>>> {
    let entries = select_records::<JournalEntry>(&state, &query).await?;
    Ok(Json(entries))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path((date_key, id)): Path<(String, String)>,
) -> AppResult<Json<DeleteResponse>> {
    let day: DateKey = date_key.parse().map_err(AppError::Validation)?;
    let outcome = state.gateway.delete::<JournalEntry>(&id, day).await?;

    if state.rest_timer.cancel(&id).await {
        tracing::debug!(entry_id = %id, "Cancelled rest timer of deleted entry");
    }
    if outcome == DeleteOutcome::Deleted {
        broadcast_change(&state, "journal", &id);
    }
    Ok(Json(DeleteResponse { id, outcome }))
}

pub async fn cancel_rest_timer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CancelResponse>> {
    if !state.rest_timer.cancel(&id).await {
        return Err(AppError::NotFound(format!("No rest timer pending for entry {id}")));
    }
    Ok(Json(CancelResponse { id, cancelled: true }))
}
