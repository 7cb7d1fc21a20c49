pub mod health;
pub mod receipts;

pub use health::*;
pub use receipts::*;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

pub fn router(app_state: AppState) -> Router {
    // Base64 bodies are a third larger than the image they carry.
    let body_limit = app_state.pipeline.config().max_image_bytes / 3 * 4 + 1024;

    let health_state = HealthState {
        app: app_state.clone(),
        started: Instant::now(),
    };

    Router::new()
        .route("/health", get(health_check))
        .with_state(health_state)

        .route("/api/receipts", post(submit_receipt))
        .route("/api/receipts/base64", post(submit_receipt_base64))
        .with_state(app_state)

        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::default().include_headers(true)),
                )
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}
