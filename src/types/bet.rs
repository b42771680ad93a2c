//! Bet types for user-facing API

use crate::constants::parse_token_amount;
use crate::contracts::ICoinFlip;
use crate::error::Result;
use alloy::primitives::{Address, TxHash, U256};
use std::fmt;

/// Coin face a bet is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Heads,
    Tails,
}

impl Face {
    /// Contract encoding: heads is `true`
    pub fn as_bool(self) -> bool {
        matches!(self, Face::Heads)
    }

    pub fn from_bool(heads: bool) -> Self {
        if heads {
            Face::Heads
        } else {
            Face::Tails
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Face::Heads => write!(f, "Heads"),
            Face::Tails => write!(f, "Tails"),
        }
    }
}

/// A bet about to be placed; consumed by the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetIntent {
    pub face: Face,
    pub token: Address,
    /// Stake in base units (18 decimals)
    pub amount: U256,
}

impl BetIntent {
    pub fn new(face: Face, token: Address, amount: U256) -> Self {
        Self {
            face,
            token,
            amount,
        }
    }

    /// Bet with a decimal amount such as "1" or "0.25"
    pub fn parse(face: Face, token: Address, amount: &str) -> Result<Self> {
        Ok(Self::new(face, token, parse_token_amount(amount)?))
    }

    /// Encoded contract call
    pub fn to_call(&self) -> ICoinFlip::flipCall {
        ICoinFlip::flipCall {
            face: self.face.as_bool(),
            token: self.token,
            amount: self.amount,
        }
    }
}

/// Result shown to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
}

impl Outcome {
    /// Outcome as the frontend reports it: a successful transaction is a win.
    ///
    /// This reads the receipt's execution flag, not the game result; use
    /// `FlipClient::game_outcome` for what the contract decided.
    pub fn from_execution(success: bool) -> Self {
        if success {
            Outcome::Win
        } else {
            Outcome::Lose
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Win => "Win",
            Outcome::Lose => "Lose",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmed flip transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetReceipt {
    pub outcome: Outcome,
    pub tx_hash: TxHash,
    /// `requestId` of the `BetSent` event, if the contract emitted one
    pub request_id: Option<U256>,
}

/// `getBetStatus` result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetStatus {
    pub exists: bool,
    pub fulfilled: bool,
}

impl From<ICoinFlip::getBetStatusReturn> for BetStatus {
    fn from(ret: ICoinFlip::getBetStatusReturn) -> Self {
        Self {
            exists: ret.exists,
            fulfilled: ret.fulfilled,
        }
    }
}

/// `getGameOutcome` result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    pub face: Face,
    pub won: bool,
    pub payout: U256,
}

impl From<ICoinFlip::getGameOutcomeReturn> for GameOutcome {
    fn from(ret: ICoinFlip::getGameOutcomeReturn) -> Self {
        Self {
            face: Face::from_bool(ret.face),
            won: ret.won,
            payout: ret.payout,
        }
    }
}
