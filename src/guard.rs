//! Pre-flight checks before a token spend

use crate::chain::ChainReader;
use crate::constants::required_payout_reserve;
use crate::contracts::IERC20;
use crate::error::{FlipError, Report, Result};
use crate::signer::{TransactionSigner, TxRequest};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;

/// Balance, liquidity and allowance checks for a spend-requiring call
///
/// Nothing is cached: every check re-reads the chain.
pub struct TokenGuard<'a, R, S> {
    reader: &'a R,
    signer: &'a S,
}

impl<'a, R: ChainReader, S: TransactionSigner> TokenGuard<'a, R, S> {
    pub fn new(reader: &'a R, signer: &'a S) -> Self {
        Self { reader, signer }
    }

    /// Make sure `spender` can pull `amount` of `token` from `owner`
    ///
    /// 1. owner balance must cover `amount` (`InsufficientBalance`)
    /// 2. spender balance must cover the payout reserve (`InsufficientLiquidity`)
    /// 3. an allowance below `amount` is raised to exactly `amount`, and the
    ///    approval is awaited (`ApprovalFailed`)
    ///
    /// Returns the approval hash when one was sent.
    pub async fn ensure_spendable(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Option<TxHash>> {
        self.ensure_balance(token, owner, amount).await?;

        let reserve = required_payout_reserve(amount);
        let available = self.reader.read_balance(token, spender).await?;
        if available < reserve {
            return Err(FlipError::InsufficientLiquidity {
                available,
                required: reserve,
            }
            .into());
        }

        let allowance = self.reader.read_allowance(token, owner, spender).await?;
        if allowance >= amount {
            tracing::debug!(%token, %spender, %allowance, "Allowance sufficient");
            return Ok(None);
        }

        self.approve(token, spender, amount).await.map(Some)
    }

    /// Fail with `InsufficientBalance` unless `owner` holds `amount`
    pub async fn ensure_balance(&self, token: Address, owner: Address, amount: U256) -> Result<()> {
        let balance = self.reader.read_balance(token, owner).await?;
        if balance < amount {
            return Err(FlipError::InsufficientBalance {
                balance,
                required: amount,
            }
            .into());
        }
        Ok(())
    }

    /// Approve `spender` for exactly `amount` and wait for the confirmation
    pub async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash> {
        let call = IERC20::approveCall { spender, amount };
        let tx = TxRequest::new(token, Bytes::from(call.abi_encode()));

        let tx_hash = self
            .signer
            .sign_and_send(tx)
            .await
            .map_err(approval_failed)?;
        tracing::info!(%token, %spender, %amount, %tx_hash, "Approval submitted");

        let confirmation = self
            .signer
            .wait_for_receipt(tx_hash)
            .await
            .map_err(approval_failed)?;
        if !confirmation.success {
            return Err(FlipError::ApprovalFailed {
                reason: format!("approval {} reverted", tx_hash),
            }
            .into());
        }

        Ok(tx_hash)
    }
}

fn approval_failed(err: Report) -> Report {
    Report::new(FlipError::ApprovalFailed {
        reason: format!("{:#}", err),
    })
}
