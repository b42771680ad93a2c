//! flipit: coin flip wagers in ERC20 tokens on Base
//!
//! A Rust SDK and server for a coin flip game contract.
//!
//! # Features
//!
//! - Flip a coin for an ERC20 stake (balance, liquidity and allowance checked first)
//! - Deposit tokens into the game treasury
//! - Query bet status and settled outcomes
//! - Serve a Farcaster frame that flips server-side (`flipit-frame`)
//! - Terminal wallet panel (`flipit`)
//!
//! # Example
//!
//! ```rust,ignore
//! use flipit::{Face, FallbackReader, FlipClient, LocalSigner, NetworkConfig};
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let config = NetworkConfig::from_env()?;
//!     let reader = FallbackReader::from_config(&config)?;
//!     let signer = LocalSigner::from_private_key("0x...", &config.rpc_url)?;
//!     let client = FlipClient::new(reader, signer, config);
//!
//!     // Bet 1 STABLEAI on heads
//!     let receipt = client.flip("STABLEAI", "1", Face::Heads).await?;
//!     println!("{} ({})", receipt.outcome, receipt.tx_hash);
//!
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod client;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod error;
pub mod executor;
pub mod frame;
pub mod guard;
pub mod signer;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod test_helpers;

// Re-export main types for convenience
pub use chain::{ChainReader, FallbackReader, RpcReader};
pub use client::{FlipClient, FlipLocks};
pub use config::{ChainInfo, FordefiConfig, FrameConfig, FrameSignerMode, NetworkConfig, Token};
pub use error::{eyre, Context, FlipError, Report, Result};
pub use executor::BetExecutor;
pub use frame::{router, FrameResponder};
pub use guard::TokenGuard;
pub use signer::{
    ConfirmationPolicy, FordefiSigner, KeyWallet, LocalSigner, SignerSession, TransactionSigner,
    TxRequest, WalletProvider,
};
pub use types::{
    BetIntent, BetReceipt, BetStatus, DepositParams, DepositReceipt, Face, GameOutcome, Outcome,
};
pub use wallet::{WalletPanel, WalletStatus};
