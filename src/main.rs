use std::sync::Arc;
use tokio::sync::broadcast;

mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod routes;
mod services;
mod store;

use config::{Config, StoreBackend};
use services::{DisabledStepSource, HttpStepSource, JournalGateway, RestTimer, StepCountSource};
use store::{DocumentStore, MemoryStore, PostgresStore};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<JournalGateway>,
    pub store: Arc<dyn DocumentStore>,
    pub steps: Arc<dyn StepCountSource>,
    pub config: Arc<Config>,
    pub ws_tx: Option<broadcast::Sender<String>>,
    pub rest_timer: RestTimer,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        steps: Arc<dyn StepCountSource>,
    ) -> Self {
        let gateway = JournalGateway::new(
            store.clone(),
            config.journal_user_id.clone(),
            config.index_fallback_codes.clone(),
        );
        // WebSocket broadcast channel
        let (ws_tx, _) = broadcast::channel::<String>(256);

        Self {
            gateway: Arc::new(gateway),
            store,
            steps,
            config: Arc::new(config),
            rest_timer: RestTimer::new(Some(ws_tx.clone())),
            ws_tx: Some(ws_tx),
        }
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!(
                group_indexes = ?config.store_group_indexes,
                "Using in-memory document store"
            );
            Ok(Arc::new(MemoryStore::with_group_indexes(
                config.store_group_indexes.iter().cloned(),
            )))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for the postgres store"))?;
            let pool = db::create_pool(url).await?;
            tracing::info!("Using Postgres document store");
            Ok(Arc::new(PostgresStore::new(pool)))
        }
    }
}

fn step_source(config: &Config) -> anyhow::Result<Arc<dyn StepCountSource>> {
    match &config.step_source_url {
        Some(url) => {
            tracing::info!(url = %url, "Step source configured");
            Ok(Arc::new(HttpStepSource::new(
                url.as_str(),
                config.step_source_token.clone(),
            )?))
        }
        None => {
            tracing::info!("No step source configured, step insights disabled");
            Ok(Arc::new(DisabledStepSource))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "negastack_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    tracing::info!(
        user = %config.journal_user_id,
        fallback_codes = ?config.index_fallback_codes,
        "Configuration loaded"
    );

    let store = open_store(&config).await?;
    let steps = step_source(&config)?;
    let addr = config.listen_addr();

    let state = AppState::new(config, store, steps);
    let app = routes::build_router(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
