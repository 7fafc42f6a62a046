//! One-shot "rest is over" alarms.
//!
//! Each alarm is a sleeping tokio task keyed by the entry id. When it fires
//! it publishes a `rest_finished` message on the WebSocket broadcast channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Default wording for an entry's alarm.
    pub fn rest_finished(next_task: &str) -> Self {
        let body = if next_task.trim().is_empty() {
            "Your rest is over. Ready for the next step?".to_string()
        } else {
            format!("Your rest is over. Next up: {next_task}")
        };
        Self {
            title: "Time to get going".to_string(),
            body,
        }
    }
}

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
pub struct RestTimer {
    tx: Option<broadcast::Sender<String>>,
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    generation: Arc<AtomicU64>,
}

impl RestTimer {
    pub fn new(tx: Option<broadcast::Sender<String>>) -> Self {
        Self {
            tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedules an alarm for `id`, replacing any alarm already pending for
    /// it. An `at` in the past fires immediately.
    pub async fn schedule(&self, id: &str, at: DateTime<Utc>, content: Notification) {
        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        // Held across spawn so the task cannot finish before it is registered.
        let mut pending = self.pending.lock().await;

        let task_id = id.to_string();
        let tx = self.tx.clone();
        let registry = self.pending.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            {
                let mut pending = registry.lock().await;
                if pending.get(&task_id).map(|p| p.generation) == Some(generation) {
                    pending.remove(&task_id);
                }
            }

            let msg = serde_json::json!({
                "type": "rest_finished",
                "entry_id": task_id,
                "title": content.title,
                "body": content.body,
            });
            match tx {
                Some(tx) => {
                    let receivers = tx.send(msg.to_string()).unwrap_or(0);
                    tracing::info!(entry_id = %task_id, receivers, "Rest timer fired");
                }
                None => tracing::info!(entry_id = %task_id, "Rest timer fired with no channel"),
            }
        });

        if let Some(previous) = pending.insert(id.to_string(), Pending { generation, handle }) {
            previous.handle.abort();
            tracing::debug!(entry_id = %id, "Replaced pending rest timer");
        }
        tracing::info!(entry_id = %id, fire_at = %at, "Rest timer scheduled");
    }

    /// Cancels the pending alarm for `id`. Returns whether one was pending.
    pub async fn cancel(&self, id: &str) -> bool {
        match self.pending.lock().await.remove(id) {
            Some(pending) => {
                pending.handle.abort();
                tracing::info!(entry_id = %id, "Rest timer cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
