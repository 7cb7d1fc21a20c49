//! Receipt → on-chain payment orchestration.
//!
//! ```text
//! Idle ─▶ Extracting ─▶ Parsing ─▶ PricingFetch ─▶ Converting ─▶ Submitting ─▶ Confirmed
//!              │            │            │              │             │
//!              └────────────┴────────────┴──────────────┴─────────────┴──▶ Failed(stage, error)
//! ```
//!
//! Each stage consumes only the previous stage's output. A failure stops
//! the run and is reported with the stage it happened in; there is no
//! partial success.

use crate::config::{Config, PipelineConfig};
use crate::converter::convert;
use crate::error::{PipelineError, SplitzyError};
use crate::models::{PaymentResult, ReceiptImage, TransactionReceipt};
use crate::observer::{NoopObserver, PipelineObserver};
use crate::parser::parse_total;
use crate::services::{CoinGeckoOracle, EvmSubmitter, PriceOracle, TesseractExtractor, TextExtractor, TransactionSubmitter};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Extracting,
    Parsing,
    PricingFetch,
    Converting,
    Submitting,
    Confirmed,
    Failed,
}

impl PipelineState {
    /// The state that follows on success. Terminal states have none.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Extracting),
            Self::Extracting => Some(Self::Parsing),
            Self::Parsing => Some(Self::PricingFetch),
            Self::PricingFetch => Some(Self::Converting),
            Self::Converting => Some(Self::Submitting),
            Self::Submitting => Some(Self::Confirmed),
            Self::Confirmed | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Parsing => "parsing",
            Self::PricingFetch => "pricing",
            Self::Converting => "converting",
            Self::Submitting => "submitting",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Walks the state machine forward one step at a time, so no state can be
/// skipped or entered twice within a run.
struct StateTracker<'a> {
    current: PipelineState,
    observer: &'a dyn PipelineObserver,
}

impl<'a> StateTracker<'a> {
    fn new(observer: &'a dyn PipelineObserver) -> Self {
        observer.on_state(PipelineState::Idle);
        Self {
            current: PipelineState::Idle,
            observer,
        }
    }

    fn advance(&mut self) -> PipelineState {
        match self.current.next() {
            Some(next) => {
                tracing::debug!("{} -> {}", self.current, next);
                self.current = next;
                self.observer.on_state(next);
            }
            None => debug_assert!(false, "advance from terminal state {}", self.current),
        }
        self.current
    }

    fn fail(&mut self, error: SplitzyError) -> PipelineError {
        let stage = self.current;
        tracing::error!("Run failed while {}: {}", stage, error);
        self.current = PipelineState::Failed;
        self.observer.on_state(PipelineState::Failed);
        PipelineError::new(stage, error)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    extractor: Arc<dyn TextExtractor>,
    oracle: Arc<dyn PriceOracle>,
    submitter: Arc<dyn TransactionSubmitter>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        extractor: Arc<dyn TextExtractor>,
        oracle: Arc<dyn PriceOracle>,
        submitter: Arc<dyn TransactionSubmitter>,
    ) -> Self {
        Self {
            config,
            extractor,
            oracle,
            submitter,
        }
    }

    /// Builds the production collaborators: tesseract, CoinGecko and the
    /// configured chain.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let extractor = Arc::new(TesseractExtractor::new(&config.ocr));
        let oracle = Arc::new(CoinGeckoOracle::new(&config.oracle)?);
        let submitter = Arc::new(EvmSubmitter::connect(&config.chain).await?);

        Ok(Self::new(config.pipeline.clone(), extractor, oracle, submitter))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, image: ReceiptImage) -> Result<TransactionReceipt, PipelineError> {
        self.run_observed(image, &NoopObserver).await
    }

    pub async fn run_observed(
        &self,
        image: ReceiptImage,
        observer: &dyn PipelineObserver,
    ) -> Result<TransactionReceipt, PipelineError> {
        let span = tracing::info_span!("pipeline", run_id = %Uuid::new_v4());
        self.execute(Ok(image), observer)
            .instrument(span)
            .await
            .map(|result| result.receipt)
    }

    /// Validates raw bytes as part of the extraction stage, so a bad upload
    /// fails there, and returns the receipt together with the amounts that
    /// went into it.
    pub async fn run_bytes(
        &self,
        bytes: Vec<u8>,
        observer: &dyn PipelineObserver,
    ) -> Result<PaymentResult, PipelineError> {
        let span = tracing::info_span!("pipeline", run_id = %Uuid::new_v4());
        let image = ReceiptImage::new(bytes, self.config.max_image_bytes);
        self.execute(image, observer).instrument(span).await
    }

    async fn execute(
        &self,
        image: Result<ReceiptImage, SplitzyError>,
        observer: &dyn PipelineObserver,
    ) -> Result<PaymentResult, PipelineError> {
        let mut state = StateTracker::new(observer);

        state.advance();
        let image = image.map_err(|e| state.fail(e))?;
        let text = self
            .extractor
            .extract(&image, Some(observer))
            .await
            .map_err(|e| state.fail(e))?;
        drop(image);

        state.advance();
        let usd = parse_total(&text).map_err(|e| state.fail(e))?;
        tracing::info!("Extracted USD amount: {}", usd);
        observer.on_amount_parsed(&usd);

        state.advance();
        let price = self
            .oracle
            .fetch_unit_price(&self.config.asset_id)
            .await
            .map_err(|e| state.fail(e))?;
        observer.on_price(&price);

        state.advance();
        let conversion = convert(usd, price).map_err(|e| state.fail(e))?;
        tracing::info!(
            "Converted {} at {} -> {} {} ({} smallest units)",
            usd,
            price,
            conversion.crypto,
            self.config.asset_id,
            conversion.smallest_unit
        );
        observer.on_converted(&conversion);

        state.advance();
        let receipt = self
            .submitter
            .submit(conversion.smallest_unit, Some(observer))
            .await
            .map_err(|e| state.fail(e))?;

        state.advance();
        tracing::info!("Run confirmed: {:?}", receipt.tx_hash);

        Ok(PaymentResult {
            usd_amount: usd,
            unit_price: price,
            crypto_amount: conversion.crypto,
            crypto_display: conversion.crypto.display_6dp(),
            smallest_unit_amount: conversion.smallest_unit,
            receipt,
        })
    }
}
