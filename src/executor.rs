//! Flip submission and receipt parsing

use crate::contracts::ICoinFlip;
use crate::error::{classify_send_error, Result};
use crate::signer::{Confirmation, TransactionSigner, TxRequest};
use crate::types::{BetIntent, BetReceipt, Outcome};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolEvent};

/// Submits flips to the wager contract
///
/// Callers must have run `TokenGuard::ensure_spendable` for the intent first;
/// `FlipClient::flip` does both.
pub struct BetExecutor<'a, S> {
    signer: &'a S,
    coinflip: Address,
}

impl<'a, S: TransactionSigner> BetExecutor<'a, S> {
    pub fn new(signer: &'a S, coinflip: Address) -> Self {
        Self { signer, coinflip }
    }

    /// Send `flip(face, token, amount)` and wait until it is mined
    ///
    /// Waits as long as the signer's confirmation policy allows. A mined but
    /// failed transaction is reported as [`Outcome::Lose`], not as an error.
    pub async fn place_bet(&self, intent: &BetIntent) -> Result<BetReceipt> {
        let tx = TxRequest::new(self.coinflip, Bytes::from(intent.to_call().abi_encode()));

        let tx_hash = self
            .signer
            .sign_and_send(tx)
            .await
            .map_err(classify_send_error)?;
        tracing::info!(
            %tx_hash,
            face = %intent.face,
            token = %intent.token,
            amount = %intent.amount,
            "Flip submitted"
        );

        let confirmation = self.signer.wait_for_receipt(tx_hash).await?;
        let receipt = BetReceipt {
            outcome: Outcome::from_execution(confirmation.success),
            tx_hash: confirmation.tx_hash,
            request_id: bet_request_id(&confirmation, self.coinflip),
        };

        match receipt.request_id {
            Some(request_id) => {
                tracing::info!(%tx_hash, %request_id, outcome = %receipt.outcome, "Flip confirmed")
            }
            None => tracing::warn!(%tx_hash, outcome = %receipt.outcome, "Flip confirmed without BetSent"),
        }

        Ok(receipt)
    }
}

/// `requestId` of the first `BetSent` emitted by `coinflip`
pub fn bet_request_id(confirmation: &Confirmation, coinflip: Address) -> Option<U256> {
    confirmation
        .logs
        .iter()
        .filter(|log| log.address == coinflip)
        .find_map(|log| ICoinFlip::BetSent::decode_log(log).ok())
        .map(|event| event.requestId)
}
