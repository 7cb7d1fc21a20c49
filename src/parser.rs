//! Locates the bill total in OCR output.
//!
//! The first `label [sep] [currency] number` match in document order wins.
//! There is no attempt to rank candidates, so a "subtotal" printed above a
//! "grand total" is what gets picked up.
//!
//! The numeric token accepts comma-grouped thousands (`1,234.50`) as well as
//! ungrouped digit runs (`1300.00`). A strictly grouped pattern would cut an
//! ungrouped `1300.00` down to `130`.
//!
//! The whole fractional tail is captured and then held to exactly two
//! digits, so `12.5` or `45.999` is rejected with `NoAmountFound` rather
//! than read as `12` or `45.99`.

use crate::error::SplitzyError;
use crate::models::{MonetaryAmount, RecognizedText};
use once_cell::sync::Lazy;
use regex::Regex;

pub const TOTAL_LABELS: [&str; 5] = ["total", "grand total", "amount", "subtotal", "jumlah"];

static TOTAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(grand total|subtotal|total|amount|jumlah)\s*[:\-]?\s*(?:us\$|\$|usd)?\s*((?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?)",
    )
    .expect("total pattern is valid")
});

/// Returns the first labelled total found in `text`.
pub fn parse_total(text: &RecognizedText) -> Result<MonetaryAmount, SplitzyError> {
    let lowered = text.as_str().to_lowercase();

    let captures = TOTAL_PATTERN
        .captures(&lowered)
        .ok_or(SplitzyError::NoAmountFound)?;

    let label = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let token = captures
        .get(2)
        .map(|m| m.as_str())
        .ok_or(SplitzyError::NoAmountFound)?;

    let amount = MonetaryAmount::from_token(token).ok_or(SplitzyError::NoAmountFound)?;

    tracing::debug!(label, token, %amount, "Matched total");

    Ok(amount)
}
