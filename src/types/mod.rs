//! User-facing types

pub mod bet;
pub mod treasury;

pub use bet::{BetIntent, BetReceipt, BetStatus, Face, GameOutcome, Outcome};
pub use treasury::{DepositParams, DepositReceipt};
