//! Transaction signer abstraction for flipit
//!
//! State-changing calls go through [`TransactionSigner`], so the flip flow runs
//! unchanged with a local key wallet or a custodial Fordefi MPC vault. A
//! [`SignerSession`] is how a wallet hands out a signer in the first place.

mod fordefi;
mod local;
mod session;

pub use fordefi::FordefiSigner;
pub use local::{KeyWallet, LocalSigner};
pub use session::{SignerSession, WalletProvider};

use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, Log, TxHash, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionReceipt;
use crate::error::{FlipError, Report, Result};
use std::future::Future;
use std::time::Duration;

/// Transaction request parameters
#[derive(Debug, Clone)]
pub struct TxRequest {
    /// Target contract address
    pub to: Address,
    /// Transaction value in wei
    pub value: U256,
    /// Encoded calldata
    pub data: Bytes,
    /// Optional gas limit override
    pub gas_limit: Option<u64>,
}

impl TxRequest {
    /// Create a new transaction request
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: data.into(),
            gas_limit: None,
        }
    }

    /// Set gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// The 4-byte function selector of the calldata, if any
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// What the flip flow needs from a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    /// Execution-success flag of the receipt
    pub success: bool,
    pub logs: Vec<Log>,
}

impl From<&TransactionReceipt> for Confirmation {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        }
    }
}

/// How long to wait for a transaction to be mined
///
/// `max_attempts = None` waits until the receipt shows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_attempts: None,
        }
    }
}

impl ConfirmationPolicy {
    /// Give up after `max_attempts` polls
    pub fn bounded(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts: Some(max_attempts),
        }
    }
}

/// Trait for signing and sending EVM transactions
///
/// - `LocalSigner`: signs with a private key held by this process
/// - `FordefiSigner`: signs through the Fordefi MPC API
pub trait TransactionSigner: Send + Sync {
    /// Returns the signer's EVM address
    fn address(&self) -> Address;

    /// Signs and sends a transaction, returning the transaction hash
    fn sign_and_send(&self, tx: TxRequest) -> impl Future<Output = Result<TxHash>> + Send;

    /// Waits for a transaction to be mined and returns its confirmation
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Confirmation>> + Send;

    /// Gets the native token balance (ETH on Base)
    fn get_balance(&self) -> impl Future<Output = Result<U256>> + Send;
}

/// Poll `provider` for the receipt of `tx_hash` according to `policy`
pub(crate) async fn poll_receipt<P>(
    provider: &P,
    tx_hash: TxHash,
    policy: ConfirmationPolicy,
) -> Result<Confirmation>
where
    P: Provider<Ethereum> + ?Sized,
{
    let mut attempt: u32 = 0;
    loop {
        let receipt: Option<TransactionReceipt> = provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| {
                Report::new(FlipError::RpcUnavailable {
                    reason: format!("Failed to get receipt of {}: {}", tx_hash, e),
                })
            })?;

        if let Some(receipt) = receipt {
            return Ok(Confirmation::from(&receipt));
        }

        attempt += 1;
        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            eyre::bail!("Transaction receipt not found after {} polls: {}", attempt, tx_hash);
        }

        tracing::debug!(%tx_hash, attempt, "Waiting for confirmation");
        tokio::time::sleep(policy.poll_interval).await;
    }
}
