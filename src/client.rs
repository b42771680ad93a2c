//! FlipClient - main entry point for the SDK

use crate::chain::ChainReader;
use crate::config::{NetworkConfig, Token};
use crate::contracts::ICoinFlip;
use crate::error::{classify_send_error, FlipError, Result};
use crate::executor::BetExecutor;
use crate::guard::TokenGuard;
use crate::signer::{TransactionSigner, TxRequest};
use crate::types::{
    BetIntent, BetReceipt, BetStatus, DepositParams, DepositReceipt, Face, GameOutcome,
};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use eyre::Context;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One flip in flight per signer address
///
/// A second flip from the same address waits for the first to finish, so the
/// allowance check and the spend are never interleaved for one account.
#[derive(Default)]
pub struct FlipLocks {
    locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl FlipLocks {
    pub async fn acquire(&self, address: Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(address).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Like [`FlipLocks::acquire`], but gives up after `wait`
    pub async fn acquire_within(
        &self,
        address: Address,
        wait: Duration,
    ) -> Result<OwnedMutexGuard<()>> {
        tokio::time::timeout(wait, self.acquire(address))
            .await
            .map_err(|_| eyre::eyre!("A flip from {} is still in flight after {:?}", address, wait))
    }
}

/// Main client for playing the coin flip game
pub struct FlipClient<R: ChainReader, S: TransactionSigner> {
    reader: R,
    signer: S,
    config: NetworkConfig,
    locks: Arc<FlipLocks>,
    lock_wait: Option<Duration>,
}

impl<R: ChainReader, S: TransactionSigner> FlipClient<R, S> {
    /// Create a new FlipClient
    pub fn new(reader: R, signer: S, config: NetworkConfig) -> Self {
        Self {
            reader,
            signer,
            config,
            locks: Arc::default(),
            lock_wait: None,
        }
    }

    /// Share a lock table with other clients of the same process
    pub fn with_locks(mut self, locks: Arc<FlipLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Fail a flip instead of queueing it when the address stays busy for `wait`
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = Some(wait);
        self
    }

    /// Get the signer's address
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the network configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Look up a configured token by symbol
    pub fn token(&self, symbol: &str) -> Result<&Token> {
        self.config.token(symbol)
    }

    // ========== Game Operations ==========

    /// Flip `amount` (decimal, e.g. "1") of the token `symbol` on `face`
    pub async fn flip(&self, symbol: &str, amount: &str, face: Face) -> Result<BetReceipt> {
        let token = self.token(symbol)?;
        let intent = BetIntent::parse(face, token.address, amount)?;
        self.place_bet(intent).await
    }

    /// Check the balances and allowance for `intent`, then place it
    pub async fn place_bet(&self, intent: BetIntent) -> Result<BetReceipt> {
        let owner = self.address();
        let _in_flight = match self.lock_wait {
            Some(wait) => self.locks.acquire_within(owner, wait).await?,
            None => self.locks.acquire(owner).await,
        };

        TokenGuard::new(&self.reader, &self.signer)
            .ensure_spendable(intent.token, owner, self.config.coinflip, intent.amount)
            .await
            .inspect_err(report_contract_error)?;

        BetExecutor::new(&self.signer, self.config.coinflip)
            .place_bet(&intent)
            .await
            .inspect_err(report_contract_error)
    }

    /// Fund the game treasury with `params.amount` of `params.token`
    ///
    /// The wager contract is always approved for exactly the deposit amount.
    pub async fn deposit_to_treasury(&self, params: DepositParams) -> Result<DepositReceipt> {
        let owner = self.address();
        let guard = TokenGuard::new(&self.reader, &self.signer);

        guard.ensure_balance(params.token, owner, params.amount).await?;
        let approval_tx = guard
            .approve(params.token, self.config.coinflip, params.amount)
            .await?;

        let call = ICoinFlip::depositERC20Call {
            token: params.token,
            amount: params.amount,
        };
        let tx = TxRequest::new(self.config.coinflip, Bytes::from(call.abi_encode()));
        let tx_hash = self
            .signer
            .sign_and_send(tx)
            .await
            .map_err(classify_send_error)
            .inspect_err(report_contract_error)?;
        tracing::info!(%tx_hash, token = %params.token, amount = %params.amount, "Treasury deposit submitted");

        let confirmation = self.signer.wait_for_receipt(tx_hash).await?;
        if !confirmation.success {
            return Err(FlipError::TransactionReverted {
                reason: Some(format!("deposit {} reverted", tx_hash)),
            }
            .into());
        }

        Ok(DepositReceipt {
            tx_hash,
            approval_tx,
        })
    }

    // ========== Bet Queries ==========

    /// Get bet status from the contract
    pub async fn bet_status(&self, request_id: U256) -> Result<BetStatus> {
        let status = self
            .reader
            .view(self.config.coinflip, ICoinFlip::getBetStatusCall { requestId: request_id })
            .await
            .context("Failed to get bet status")?;
        Ok(status.into())
    }

    /// Get the settled outcome of a bet from the contract
    pub async fn game_outcome(&self, request_id: U256) -> Result<GameOutcome> {
        let outcome = self
            .reader
            .view(
                self.config.coinflip,
                ICoinFlip::getGameOutcomeCall { requestId: request_id },
            )
            .await
            .context("Failed to get game outcome")?;
        Ok(outcome.into())
    }

    // ========== Utility Methods ==========

    /// Balance of `symbol` held by the signer
    pub async fn token_balance(&self, symbol: &str) -> Result<U256> {
        let token = self.token(symbol)?;
        self.reader.read_balance(token.address, self.address()).await
    }

    /// Get native token (ETH) balance
    pub async fn get_eth_balance(&self) -> Result<U256> {
        self.signer.get_balance().await
    }
}

/// Log a failed contract interaction by class
fn report_contract_error(err: &eyre::Report) {
    match FlipError::of(err) {
        Some(FlipError::TransactionReverted { reason }) => {
            tracing::error!(reason = reason.as_deref().unwrap_or("none"), "Transaction reverted")
        }
        Some(FlipError::UserRejected) => tracing::error!("User rejected the action"),
        Some(other) => tracing::warn!("Flip refused: {}", other),
        None => tracing::error!("Unexpected error: {:#}", err),
    }
}
