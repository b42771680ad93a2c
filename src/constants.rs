//! Constants and unit conversion for the flip game

use crate::error::{FlipError, Result};
use alloy::primitives::utils::{format_units, parse_units, ParseUnits};
use alloy::primitives::U256;

/// Every supported wager token uses 18 decimals
pub const TOKEN_DECIMALS: u8 = 18;

/// The contract pays out twice the stake (`_getPayout(amount)`)
pub const PAYOUT_MULTIPLIER: u64 = 2;

/// Chain ID of Base mainnet
pub const BASE_CHAIN_ID: u64 = 8453;

/// Chain ID of Base Sepolia
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;

/// Token the frame endpoint wagers with, unless configured otherwise
pub const DEFAULT_FRAME_TOKEN: &str = "STABLEAI";

/// Wager placed by the frame endpoint, in whole tokens
pub const DEFAULT_FRAME_AMOUNT: &str = "1";

/// Public URL of the frame endpoint, used as the "Play Again" target
pub const DEFAULT_FRAME_ENDPOINT: &str = "https://flip-it-three.vercel.app/api/flip";

/// Where `win.png` / `lose.png` are hosted
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://example.com";

/// Parse a decimal token amount ("1", "0.5") into base units
pub fn parse_token_amount(amount: &str) -> Result<U256> {
    let trimmed = amount.trim();
    match parse_units(trimmed, TOKEN_DECIMALS) {
        Ok(ParseUnits::U256(value)) if !value.is_zero() => Ok(value),
        _ => Err(FlipError::InvalidAmount(amount.to_string()).into()),
    }
}

/// Format base units as a decimal token amount, keeping at least one decimal
pub fn format_token_amount(value: U256) -> String {
    let Ok(formatted) = format_units(value, TOKEN_DECIMALS) else {
        return value.to_string();
    };
    let trimmed = formatted.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Contract balance needed to pay out a winning bet of `amount`
pub fn required_payout_reserve(amount: U256) -> U256 {
    amount.saturating_mul(U256::from(PAYOUT_MULTIPLIER))
}
