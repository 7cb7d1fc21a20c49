pub mod ocr;
pub mod price_oracle;
pub mod submitter;

pub use ocr::{TesseractExtractor, TextExtractor};
pub use price_oracle::{CoinGeckoOracle, PriceOracle};
pub use submitter::{await_confirmation, EvmSubmitter, SignerClient, TransactionSubmitter};
