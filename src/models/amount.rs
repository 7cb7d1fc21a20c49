use ethers::types::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Decimal places of the chain's smallest unit (wei).
pub const SMALLEST_UNIT_DECIMALS: u32 = 18;

/// A USD amount read off a receipt. Always non-negative with exactly two
/// fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct MonetaryAmount(Decimal);

impl MonetaryAmount {
    /// Parses a numeric token such as `1,234.50` or `45`.
    ///
    /// Thousands separators are stripped; the token must carry either no
    /// fractional part or exactly two fractional digits.
    pub fn from_token(token: &str) -> Option<Self> {
        let cleaned = token.trim().replace(',', "");
        if cleaned.is_empty() || cleaned.starts_with('-') || cleaned.starts_with('+') {
            return None;
        }

        match cleaned.split_once('.') {
            Some((_, frac)) if frac.len() != 2 => return None,
            _ => {}
        }

        let value = Decimal::from_str(&cleaned).ok()?;
        Self::try_from(value).ok()
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for MonetaryAmount {
    type Error = String;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(format!("negative USD amount: {}", value));
        }
        if value.normalize().scale() > 2 {
            return Err(format!("USD amount has more than two decimals: {}", value));
        }

        let mut value = value.abs();
        value.rescale(2);
        Ok(Self(value))
    }
}

impl From<MonetaryAmount> for Decimal {
    fn from(amount: MonetaryAmount) -> Self {
        amount.0
    }
}

impl fmt::Display for MonetaryAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// USD per one unit of the target asset, as reported by the price oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitPrice(pub Decimal);

impl UnitPrice {
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0.normalize())
    }
}

/// Amount in the asset's major unit (ETH).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CryptoAmount(pub Decimal);

impl CryptoAmount {
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Six-decimal rendering used for display.
    pub fn display_6dp(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero);
        format!("{:.6}", rounded)
    }
}

impl fmt::Display for CryptoAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Integer amount in the chain's smallest unit; this is the calldata value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SmallestUnitAmount(pub U256);

impl SmallestUnitAmount {
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Decimal string form, as sent in the `set` call.
    pub fn to_decimal_string(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for SmallestUnitAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for SmallestUnitAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for SmallestUnitAmount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_dec_str(&raw)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}
