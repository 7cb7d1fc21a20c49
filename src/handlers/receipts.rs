use crate::{
    error::{PipelineError, SplitzyError},
    models::{ApiResponse, PaymentResult},
    observer::NoopObserver,
    pipeline::{Pipeline, PipelineState},
};
use axum::{body::Bytes, extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

#[derive(Debug, Deserialize)]
pub struct Base64Upload {
    pub image_base64: String,
}

/// `POST /api/receipts` with the raw image as the request body.
pub async fn submit_receipt(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<PaymentResult>>, PipelineError> {
    process(&state.pipeline, body.to_vec()).await
}

/// `POST /api/receipts/base64` with `{"image_base64": "..."}`.
pub async fn submit_receipt_base64(
    State(state): State<AppState>,
    Json(upload): Json<Base64Upload>,
) -> Result<Json<ApiResponse<PaymentResult>>, PipelineError> {
    let encoded = upload.image_base64.trim();
    // Accept data URLs as produced by browsers.
    let encoded = encoded
        .split_once(";base64,")
        .map(|(_, data)| data)
        .unwrap_or(encoded);

    let bytes = STANDARD.decode(encoded).map_err(|e| {
        PipelineError::new(
            PipelineState::Extracting,
            SplitzyError::ExtractionFailure(format!("invalid base64 image: {}", e)),
        )
    })?;

    process(&state.pipeline, bytes).await
}

async fn process(
    pipeline: &Pipeline,
    bytes: Vec<u8>,
) -> Result<Json<ApiResponse<PaymentResult>>, PipelineError> {
    let result = pipeline.run_bytes(bytes, &NoopObserver).await?;

    Ok(Json(ApiResponse {
        success: true,
        data: result,
        timestamp: Utc::now(),
        request_id: Uuid::new_v4().to_string(),
    }))
}
