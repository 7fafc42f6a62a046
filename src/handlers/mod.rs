pub mod calendar;
pub mod entries;
pub mod full_charges;
pub mod health;
pub mod insights;
pub mod logs;
pub mod ws;

use crate::dto::{RecordSelection, RecordsQuery};
use crate::error::{AppError, AppResult};
use crate::models::JournalRecord;
use crate::AppState;

/// Shared read path of the entry and full-charge list endpoints.
async fn select_records<R: JournalRecord>(state: &AppState, query: &RecordsQuery) -> AppResult<Vec<R>> {
    let selection = query
        .selection(state.config.recent_limit)
        .map_err(AppError::Validation)?;
    let records = match selection {
        RecordSelection::Day(day) => state.gateway.for_date::<R>(day).await?,
        RecordSelection::Range(start, end) => state.gateway.in_range::<R>(start, end).await?,
        RecordSelection::Recent(limit) => state.gateway.recent::<R>(limit).await?,
    };
    Ok(records)
}

/// Tells connected clients that the journal changed.
fn broadcast_change(state: &AppState, kind: &str, id: &str) {
    if let Some(tx) = state.ws_tx.as_ref() {
        let msg = serde_json::json!({
            "type": "journal_changed",
            "kind": kind,
            "id": id,
        });
        let _ = tx.send(msg.to_string());
    }
}
