//! Signer sessions handed out by a wallet provider

use super::TransactionSigner;
use crate::config::ChainInfo;
use crate::error::{FlipError, Result};
use alloy::primitives::Address;
use std::future::Future;

/// An injected wallet that can authorise accounts and sign for them
pub trait WalletProvider: Send + Sync {
    type Signer: TransactionSigner;

    /// Ask the wallet for account access; may wait for the user to approve
    ///
    /// A declined request fails with [`FlipError::UserRejected`].
    fn request_accounts(&self) -> impl Future<Output = Result<Vec<Address>>> + Send;

    /// Signer for an authorised account on `chain`
    fn signer_for(&self, account: Address, chain: &ChainInfo) -> Result<Self::Signer>;
}

/// A signer bound to one authorised address on one network
pub struct SignerSession<S> {
    signer: S,
    chain_id: u64,
}

impl<S: TransactionSigner> SignerSession<S> {
    /// Obtain a signer from the injected provider
    ///
    /// Fails with [`FlipError::ProviderUnavailable`] when there is no provider
    /// and [`FlipError::UserRejected`] when the wallet grants no account. Not
    /// retried; callers keep the session or acquire a new one.
    pub async fn acquire<P>(provider: Option<&P>, chain: &ChainInfo) -> Result<Self>
    where
        P: WalletProvider<Signer = S>,
    {
        let provider = provider.ok_or(FlipError::ProviderUnavailable)?;

        let accounts = provider.request_accounts().await?;
        let account = *accounts.first().ok_or(FlipError::UserRejected)?;

        let signer = provider.signer_for(account, chain)?;
        tracing::info!(%account, chain = %chain, "Wallet session established");

        Ok(Self {
            signer,
            chain_id: chain.chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{addr, MockWallet};

    fn chain() -> ChainInfo {
        ChainInfo::base("http://localhost:8545")
    }

    #[tokio::test]
    async fn test_acquire_without_provider() {
        let err = SignerSession::acquire(None::<&MockWallet>, &chain())
            .await
            .err()
            .unwrap();
        assert_eq!(FlipError::of(&err), Some(&FlipError::ProviderUnavailable));
    }

    #[tokio::test]
    async fn test_acquire_declined() {
        let wallet = MockWallet::new(addr(1)).declining();
        let err = SignerSession::acquire(Some(&wallet), &chain()).await.err().unwrap();
        assert_eq!(FlipError::of(&err), Some(&FlipError::UserRejected));
    }

    #[tokio::test]
    async fn test_acquire_binds_first_account() {
        let wallet = MockWallet::new(addr(1));
        let session = SignerSession::acquire(Some(&wallet), &chain()).await.unwrap();
        assert_eq!(session.address(), addr(1));
        assert_eq!(session.chain_id(), 8453);
        assert_eq!(wallet.requests(), 1);
    }
}
