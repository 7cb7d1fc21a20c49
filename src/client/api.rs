use crate::error::ErrorResponse;
use crate::models::{ApiResponse, PaymentResult};
use anyhow::{Context, Result};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::path::Path;
use thiserror::Error;

/// A structured failure returned by the server.
#[derive(Error, Debug)]
#[error("server rejected receipt ({status}): {} [{}]", .body.error, .body.error_code)]
pub struct RemoteFailure {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

/// Uploads receipt images to a running Splitzy server.
pub struct ReceiptApiClient {
    client: Client,
    base_url: String,
}

impl ReceiptApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn submit_file(&self, path: &Path) -> Result<PaymentResult> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        self.submit_image(bytes).await
    }

    pub async fn submit_image(&self, bytes: Vec<u8>) -> Result<PaymentResult> {
        let url = format!("{}/api/receipts", self.base_url);

        tracing::info!("Uploading {} bytes to {}", bytes.len(), url);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .context("Failed to reach server")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(body) => Err(RemoteFailure { status, body }.into()),
                Err(_) => anyhow::bail!("Request failed ({}): {}", status, text),
            };
        }

        let payload: ApiResponse<PaymentResult> = response
            .json()
            .await
            .context("Unexpected response body")?;

        Ok(payload.data)
    }
}
