use crate::models::format_hash;
use crate::pipeline::PipelineState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use ethers::types::H256;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Failure kinds a single stage can report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitzyError {
    #[error("Text extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("No total amount found in recognized text")]
    NoAmountFound,

    #[error("Price fetch failed: {message}")]
    PriceFetchFailure { message: String, transient: bool },

    #[error("Invalid unit price: {0}")]
    InvalidPrice(String),

    #[error("Transaction submission failed: {0}")]
    SubmissionFailure(String),

    #[error("Transaction {} was broadcast but not confirmed: {reason}", format_hash(.tx_hash))]
    ConfirmationTimeout { tx_hash: H256, reason: String },
}

impl SplitzyError {
    pub fn price_fetch(message: impl Into<String>, transient: bool) -> Self {
        Self::PriceFetchFailure {
            message: message.into(),
            transient,
        }
    }

    /// Only transient price lookups are worth another attempt. Everything
    /// else either cannot improve or risks a duplicate payment.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PriceFetchFailure { transient: true, .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ExtractionFailure(_) => "EXTRACTION_FAILURE",
            Self::NoAmountFound => "NO_AMOUNT_FOUND",
            Self::PriceFetchFailure { .. } => "PRICE_FETCH_FAILURE",
            Self::InvalidPrice(_) => "INVALID_PRICE",
            Self::SubmissionFailure(_) => "SUBMISSION_FAILURE",
            Self::ConfirmationTimeout { .. } => "CONFIRMATION_TIMEOUT",
        }
    }
}

/// A failed run: which stage broke and how.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineError {
    pub stage: PipelineState,
    #[source]
    pub error: SplitzyError,
}

impl PipelineError {
    pub fn new(stage: PipelineState, error: SplitzyError) -> Self {
        Self { stage, error }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub stage: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();

        let (status, tx_hash) = match &self.error {
            SplitzyError::ExtractionFailure(_) | SplitzyError::NoAmountFound => {
                (StatusCode::UNPROCESSABLE_ENTITY, None)
            }
            SplitzyError::PriceFetchFailure { .. }
            | SplitzyError::InvalidPrice(_)
            | SplitzyError::SubmissionFailure(_) => (StatusCode::BAD_GATEWAY, None),
            SplitzyError::ConfirmationTimeout { tx_hash, .. } => {
                (StatusCode::GATEWAY_TIMEOUT, Some(format_hash(tx_hash)))
            }
        };

        let error_code = self.error.code();
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            stage: self.stage.to_string(),
            timestamp: Utc::now(),
            request_id,
            tx_hash,
        };

        tracing::error!(
            error = ?self,
            error_code = error_code,
            "Receipt run failed"
        );

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_price_failures_retry() {
        assert!(SplitzyError::price_fetch("HTTP 503", true).is_retryable());
        assert!(!SplitzyError::price_fetch("missing field", false).is_retryable());
        assert!(!SplitzyError::SubmissionFailure("nonce too low".into()).is_retryable());
        assert!(!SplitzyError::NoAmountFound.is_retryable());
    }

    #[test]
    fn pipeline_error_names_the_stage() {
        let err = PipelineError::new(PipelineState::PricingFetch, SplitzyError::price_fetch("HTTP 500", true));
        assert_eq!(err.to_string(), "pricing stage failed: Price fetch failed: HTTP 500");
    }

    #[test]
    fn timeout_reports_hash() {
        let err = SplitzyError::ConfirmationTimeout {
            tx_hash: H256::zero(),
            reason: "no receipt after 60s".into(),
        };
        assert!(err.to_string().contains(&format!("0x{}", "0".repeat(64))));
        assert_eq!(err.code(), "CONFIRMATION_TIMEOUT");
    }

    #[tokio::test]
    async fn timeout_maps_to_gateway_timeout() {
        let err = PipelineError::new(
            PipelineState::Submitting,
            SplitzyError::ConfirmationTimeout {
                tx_hash: H256::zero(),
                reason: "dropped".into(),
            },
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
