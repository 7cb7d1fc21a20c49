use anyhow::{bail, Context, Result};
use ethers::types::Address;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub tesseract_bin: String,
    pub language: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: Address,
    pub signer_private_key: String,
    pub confirmation_timeout: Duration,
    pub confirmations: usize,
    pub poll_interval: Duration,
}

/// Per-run settings the orchestrator is constructed with.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub asset_id: String,
    pub max_image_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            asset_id: "ethereum".to_string(),
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    pub pipeline: PipelineConfig,
    pub ocr: OcrConfig,
    pub oracle: OracleConfig,
    pub chain: ChainConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let environment = Self::parse_environment()?;

        let config = Self {
            environment,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_or("PORT", 8080)?,

            pipeline: PipelineConfig {
                asset_id: std::env::var("PRICE_ASSET_ID").unwrap_or_else(|_| "ethereum".to_string()),
                max_image_bytes: Self::parse_or("MAX_IMAGE_BYTES", 10 * 1024 * 1024)?,
            },

            ocr: OcrConfig {
                tesseract_bin: std::env::var("TESSERACT_BIN").unwrap_or_else(|_| "tesseract".to_string()),
                language: std::env::var("OCR_LANGUAGE").unwrap_or_else(|_| "eng".to_string()),
                timeout: Duration::from_secs(Self::parse_or("OCR_TIMEOUT_SECS", 60)?),
            },

            oracle: OracleConfig {
                base_url: std::env::var("PRICE_API_URL")
                    .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
                max_retries: Self::parse_or("PRICE_MAX_RETRIES", 2)?,
                retry_delay: Duration::from_millis(Self::parse_or("PRICE_RETRY_DELAY_MS", 500)?),
                request_timeout: Duration::from_secs(Self::parse_or("PRICE_TIMEOUT_SECS", 10)?),
            },

            chain: ChainConfig {
                rpc_url: std::env::var("CHAIN_RPC_URL").context("CHAIN_RPC_URL required")?,
                chain_id: Self::parse_or("CHAIN_ID", 11_155_111)?,
                contract_address: Self::parse_address("CONTRACT_ADDRESS")?,
                signer_private_key: std::env::var("SIGNER_PRIVATE_KEY")
                    .context("SIGNER_PRIVATE_KEY required")?,
                confirmation_timeout: Duration::from_secs(Self::parse_or("CONFIRMATION_TIMEOUT_SECS", 60)?),
                confirmations: Self::parse_or("CONFIRMATIONS", 1)?,
                poll_interval: Duration::from_millis(Self::parse_or("CHAIN_POLL_INTERVAL_MS", 2000)?),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_environment() -> Result<Environment> {
        let env = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testnet" | "test" => Ok(Environment::Testnet),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn parse_or<T>(var: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match std::env::var(var) {
            Ok(raw) => raw.trim().parse().with_context(|| format!("Invalid {}", var)),
            Err(_) => Ok(default),
        }
    }

    fn parse_address(var: &str) -> Result<Address> {
        let addr_str = std::env::var(var).with_context(|| format!("{} required", var))?;
        Address::from_str(&addr_str).with_context(|| format!("Invalid address for {}", var))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.chain.rpc_url.starts_with("http") {
            bail!("CHAIN_RPC_URL must be HTTP(S) URL");
        }
        if !self.oracle.base_url.starts_with("http") {
            bail!("PRICE_API_URL must be HTTP(S) URL");
        }

        if !self.chain.signer_private_key.starts_with("0x") {
            bail!("SIGNER_PRIVATE_KEY must start with 0x");
        }

        if self.chain.confirmation_timeout.is_zero() {
            bail!("CONFIRMATION_TIMEOUT_SECS must be greater than 0");
        }
        if self.pipeline.asset_id.trim().is_empty() {
            bail!("PRICE_ASSET_ID must not be empty");
        }

        tracing::info!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 8080,
            pipeline: PipelineConfig::default(),
            ocr: OcrConfig {
                tesseract_bin: "tesseract".to_string(),
                language: "eng".to_string(),
                timeout: Duration::from_secs(60),
            },
            oracle: OracleConfig {
                base_url: "https://api.coingecko.com/api/v3".to_string(),
                max_retries: 2,
                retry_delay: Duration::from_millis(500),
                request_timeout: Duration::from_secs(10),
            },
            chain: ChainConfig {
                rpc_url: "http://localhost:8545".to_string(),
                chain_id: 31337,
                contract_address: Address::zero(),
                signer_private_key: format!("0x{}", "11".repeat(32)),
                confirmation_timeout: Duration::from_secs(60),
                confirmations: 1,
                poll_interval: Duration::from_millis(2000),
            },
        }
    }

    #[test]
    fn sample_config_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_non_http_rpc() {
        let mut config = sample();
        config.chain.rpc_url = "ws://localhost:8546".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unprefixed_key() {
        let mut config = sample();
        config.chain.signer_private_key = "11".repeat(32);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_confirmation_timeout() {
        let mut config = sample();
        config.chain.confirmation_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
