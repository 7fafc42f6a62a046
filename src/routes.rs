use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let mut origins = Vec::new();
    match state.config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => origins.push(origin),
        Err(e) => tracing::warn!(error = %e, url = %state.config.frontend_url, "Ignoring invalid FRONTEND_URL"),
    }
    // In dev, also allow LAN access (e.g. testing from another device)
    if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
        origins.extend(extra.split(',').filter_map(|o| o.trim().parse::<HeaderValue>().ok()));
    }
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler))
        // Journal entries
        .route(
            "/api/entries",
            get(handlers::entries::list_entries).post(handlers::entries::create_entry),
        )
        .route(
            "/api/entries/:date_key/:id",
            delete(handlers::entries::delete_entry),
        )
        .route(
            "/api/rest-timers/:id",
            delete(handlers::entries::cancel_rest_timer),
        )
        // Full charges
        .route(
            "/api/full-charges",
            get(handlers::full_charges::list_full_charges)
                .post(handlers::full_charges::create_full_charge),
        )
        // Views
        .route("/api/logs", get(handlers::logs::list_logs))
        .route("/api/calendar", get(handlers::calendar::month_calendar))
        .route("/api/insights", get(handlers::insights::get_insights))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
