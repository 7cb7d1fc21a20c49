//! Progress hooks for a pipeline run.
//!
//! Observers see intermediate values (the parsed USD total, the converted
//! amounts, the broadcast hash) for display purposes. Nothing an observer
//! does feeds back into the run.

use crate::converter::Conversion;
use crate::models::{MonetaryAmount, UnitPrice};
use crate::pipeline::PipelineState;
use ethers::types::H256;
use std::sync::Mutex;

/// All methods default to no-ops so implementors only override what they
/// display. Must be `Send + Sync`: runs execute on the tokio runtime.
pub trait PipelineObserver: Send + Sync {
    fn on_state(&self, state: PipelineState) {
        let _ = state;
    }

    /// OCR progress in percent (0..=100). Advisory only.
    fn on_extraction_progress(&self, percent: u8) {
        let _ = percent;
    }

    fn on_amount_parsed(&self, amount: &MonetaryAmount) {
        let _ = amount;
    }

    fn on_price(&self, price: &UnitPrice) {
        let _ = price;
    }

    fn on_converted(&self, conversion: &Conversion) {
        let _ = conversion;
    }

    fn on_submitted(&self, tx_hash: H256) {
        let _ = tx_hash;
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Snapshot of everything a [`RecordingObserver`] saw.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub states: Vec<PipelineState>,
    pub progress: Vec<u8>,
    pub amount: Option<MonetaryAmount>,
    pub price: Option<UnitPrice>,
    pub conversion: Option<Conversion>,
    pub tx_hash: Option<H256>,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    inner: Mutex<Recorded>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Recorded {
        self.with(|r| r.clone())
    }

    fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        // Recorded values stay valid after a panic in another callback.
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_state(&self, state: PipelineState) {
        self.with(|r| r.states.push(state));
    }

    fn on_extraction_progress(&self, percent: u8) {
        self.with(|r| r.progress.push(percent));
    }

    fn on_amount_parsed(&self, amount: &MonetaryAmount) {
        self.with(|r| r.amount = Some(*amount));
    }

    fn on_price(&self, price: &UnitPrice) {
        self.with(|r| r.price = Some(*price));
    }

    fn on_converted(&self, conversion: &Conversion) {
        self.with(|r| r.conversion = Some(*conversion));
    }

    fn on_submitted(&self, tx_hash: H256) {
        self.with(|r| r.tx_hash = Some(tx_hash));
    }
}
