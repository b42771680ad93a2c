//! Contract bindings for the coin flip game

pub mod coinflip;
pub mod erc20;

pub use coinflip::*;
pub use erc20::*;
