//! Treasury types for user-facing API

use crate::constants::parse_token_amount;
use crate::error::Result;
use alloy::primitives::{Address, TxHash, U256};

/// Parameters for funding the game treasury
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositParams {
    pub token: Address,
    /// Amount in base units (18 decimals)
    pub amount: U256,
}

impl DepositParams {
    /// Deposit a decimal amount of `token`
    pub fn new(token: Address, amount: &str) -> Result<Self> {
        Ok(Self {
            token,
            amount: parse_token_amount(amount)?,
        })
    }
}

/// Confirmed treasury deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub tx_hash: TxHash,
    /// Approval sent ahead of the deposit
    pub approval_tx: TxHash,
}
