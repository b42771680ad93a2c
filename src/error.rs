//! Error types for the flipit SDK
//!
//! Uses `eyre` for ergonomic error handling with context. Failures that callers
//! need to tell apart travel inside the report as a [`FlipError`] and can be
//! recovered with [`FlipError::of`].

use alloy::primitives::U256;
use std::fmt;

pub use eyre::{eyre, Context, Report, Result};

/// Failure classes of a flip attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipError {
    /// No wallet provider is injected
    ProviderUnavailable,
    /// The wallet (or its approver) declined the request
    UserRejected,
    /// The signer holds less than the wager
    InsufficientBalance { balance: U256, required: U256 },
    /// The wager contract cannot cover the payout
    InsufficientLiquidity { available: U256, required: U256 },
    /// The approval transaction failed, reverted or was declined
    ApprovalFailed { reason: String },
    /// The contract rejected the transaction
    TransactionReverted { reason: Option<String> },
    /// The JSON-RPC endpoint could not be reached or answered garbage
    RpcUnavailable { reason: String },
    /// Token symbol missing from the configured token table
    UnknownToken(String),
    /// Amount string is not a valid 18-decimal quantity
    InvalidAmount(String),
}

impl FlipError {
    /// Find the flip error carried by a report, if any
    pub fn of(report: &Report) -> Option<&FlipError> {
        report.downcast_ref::<FlipError>()
    }

    /// Whether a report carries the given error class (payload ignored)
    pub fn is(report: &Report, class: fn(&FlipError) -> bool) -> bool {
        Self::of(report).is_some_and(class)
    }

    /// Short user-facing message
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "No wallet available. Connect a wallet first.",
            Self::UserRejected => "Request rejected in the wallet.",
            Self::InsufficientBalance { .. } => "Insufficient token balance.",
            Self::InsufficientLiquidity { .. } => "The game cannot cover this bet right now.",
            Self::ApprovalFailed { .. } => "Token approval failed.",
            Self::TransactionReverted { .. } => "The contract rejected the transaction.",
            Self::RpcUnavailable { .. } => "Network unavailable, try again.",
            Self::UnknownToken(_) => "Unsupported token.",
            Self::InvalidAmount(_) => "Invalid amount.",
        }
    }
}

impl fmt::Display for FlipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable => {
                write!(f, "Ethereum provider not available, configure a wallet")
            }
            Self::UserRejected => write!(f, "User rejected the action"),
            Self::InsufficientBalance { balance, required } => write!(
                f,
                "Insufficient user token balance: {} available, {} needed",
                crate::constants::format_token_amount(*balance),
                crate::constants::format_token_amount(*required)
            ),
            Self::InsufficientLiquidity {
                available,
                required,
            } => write!(
                f,
                "Contract has insufficient balance: {} tokens available, {} needed",
                crate::constants::format_token_amount(*available),
                crate::constants::format_token_amount(*required)
            ),
            Self::ApprovalFailed { reason } => write!(f, "Token approval failed: {}", reason),
            Self::TransactionReverted { reason: Some(reason) } => {
                write!(f, "Transaction reverted: {}", reason)
            }
            Self::TransactionReverted { reason: None } => write!(f, "Transaction reverted"),
            Self::RpcUnavailable { reason } => write!(f, "RPC unavailable: {}", reason),
            Self::UnknownToken(symbol) => write!(f, "Unknown token symbol: {}", symbol),
            Self::InvalidAmount(amount) => write!(f, "Invalid token amount: {:?}", amount),
        }
    }
}

impl std::error::Error for FlipError {}

/// Classify a failed `sign_and_send` into the flip taxonomy
///
/// Signers report failures as free-form reports; node and wallet messages are
/// matched the same way the wallet libraries tag them.
pub fn classify_send_error(report: Report) -> Report {
    if FlipError::of(&report).is_some() {
        return report;
    }

    let message = format!("{:#}", report);
    let lower = message.to_lowercase();

    let classified = if lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("action_rejected")
    {
        FlipError::UserRejected
    } else if lower.contains("execution reverted") || lower.contains("revert") {
        FlipError::TransactionReverted {
            reason: revert_reason(&message),
        }
    } else if lower.contains("error sending request")
        || lower.contains("connection")
        || lower.contains("timed out")
        || lower.contains("dns")
    {
        FlipError::RpcUnavailable { reason: message }
    } else {
        return report;
    };

    Report::new(classified)
}

/// Extract the reason following `execution reverted:` if the node sent one
fn revert_reason(message: &str) -> Option<String> {
    let idx = message.find("execution reverted")?;
    let rest = message[idx + "execution reverted".len()..]
        .trim_start_matches(':')
        .trim();
    let reason = rest
        .split(|c: char| c == ',' || c == '\n' || c == '"')
        .next()
        .unwrap_or_default()
        .trim();

    (!reason.is_empty()).then(|| reason.to_string())
}
