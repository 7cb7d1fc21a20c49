use crate::config::ChainConfig;
use crate::contracts::{StorageContract, ENTRYPOINT};
use crate::error::SplitzyError;
use crate::models::{format_hash, ConfirmationStatus, SmallestUnitAmount, TransactionReceipt};
use crate::observer::PipelineObserver;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use ethers::{
    prelude::*,
    providers::{Http, Provider, ProviderError},
    types::{TransactionReceipt as ChainReceipt, H256},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Sends `amount` to the storage contract's `set` entrypoint and waits
    /// for the network to include it. Never retries: a resubmission after an
    /// unclear outcome could record the payment twice.
    async fn submit(
        &self,
        amount: SmallestUnitAmount,
        observer: Option<&dyn PipelineObserver>,
    ) -> Result<TransactionReceipt, SplitzyError>;
}

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct EvmSubmitter<M> {
    contract: StorageContract<M>,
    // One signing context assigns nonces sequentially, so broadcasts are
    // serialized. Confirmation waits happen outside the lock.
    send_lock: Mutex<()>,
    confirmation_timeout: Duration,
    confirmations: usize,
    poll_interval: Duration,
}

impl EvmSubmitter<SignerClient> {
    pub async fn connect(config: &ChainConfig) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())?.interval(config.poll_interval);

        let wallet = config
            .signer_private_key
            .parse::<LocalWallet>()?
            .with_chain_id(config.chain_id);
        let signer = wallet.address();

        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        // Test connection
        let block_number = client.get_block_number().await?;
        tracing::info!(
            "Chain RPC connected, current block: {}, signer: {:?}, contract: {:?}",
            block_number,
            signer,
            config.contract_address
        );

        Ok(Self::new(client, config))
    }
}

impl<M: Middleware + 'static> EvmSubmitter<M> {
    pub fn new(client: Arc<M>, config: &ChainConfig) -> Self {
        Self {
            contract: StorageContract::new(config.contract_address, client),
            send_lock: Mutex::new(()),
            confirmation_timeout: config.confirmation_timeout,
            confirmations: config.confirmations,
            poll_interval: config.poll_interval,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> TransactionSubmitter for EvmSubmitter<M> {
    async fn submit(
        &self,
        amount: SmallestUnitAmount,
        observer: Option<&dyn PipelineObserver>,
    ) -> Result<TransactionReceipt, SplitzyError> {
        let call = self.contract.set(amount.as_u256());

        let pending = {
            let _guard = self.send_lock.lock().await;
            call.send()
                .await
                .map_err(|e| SplitzyError::SubmissionFailure(e.to_string()))?
        };

        let tx_hash = pending.tx_hash();
        tracing::info!(
            "Transaction {} sent: {}({}), waiting for confirmation...",
            format_hash(&tx_hash),
            ENTRYPOINT,
            amount
        );

        if let Some(observer) = observer {
            observer.on_submitted(tx_hash);
        }

        let pending = pending
            .interval(self.poll_interval)
            .confirmations(self.confirmations);

        await_confirmation(tx_hash, pending, self.confirmation_timeout).await
    }
}

/// Waits at most `bound` for `confirmation` to yield a receipt.
///
/// Anything short of a successful receipt after broadcast (timeout, a
/// provider error while polling, a dropped transaction) is reported as
/// `ConfirmationTimeout` with the hash, since the transaction may still land.
/// A receipt with status 0 is a definite revert and reported as
/// `SubmissionFailure`.
pub async fn await_confirmation<F>(
    tx_hash: H256,
    confirmation: F,
    bound: Duration,
) -> Result<TransactionReceipt, SplitzyError>
where
    F: Future<Output = Result<Option<ChainReceipt>, ProviderError>>,
{
    let receipt = match tokio::time::timeout(bound, confirmation).await {
        Err(_) => {
            return Err(SplitzyError::ConfirmationTimeout {
                tx_hash,
                reason: format!("no confirmation within {:?}", bound),
            })
        }
        Ok(Err(e)) => {
            return Err(SplitzyError::ConfirmationTimeout {
                tx_hash,
                reason: format!("provider error while waiting: {}", e),
            })
        }
        Ok(Ok(None)) => {
            return Err(SplitzyError::ConfirmationTimeout {
                tx_hash,
                reason: "transaction dropped from mempool".to_string(),
            })
        }
        Ok(Ok(Some(receipt))) => receipt,
    };

    if receipt.status != Some(1.into()) {
        return Err(SplitzyError::SubmissionFailure(format!(
            "transaction {} reverted",
            format_hash(&tx_hash)
        )));
    }

    tracing::info!(
        "Transaction confirmed: {} in block {:?}",
        format_hash(&receipt.transaction_hash),
        receipt.block_number
    );

    Ok(TransactionReceipt {
        tx_hash: receipt.transaction_hash,
        status: ConfirmationStatus::Confirmed,
        block_number: receipt.block_number.map(|n| n.as_u64()),
        gas_used: receipt.gas_used.map(|g| g.to_string()),
        confirmed_at: Utc::now(),
    })
}
