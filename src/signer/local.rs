//! Private key wallet and signer

use super::session::WalletProvider;
use super::{poll_receipt, Confirmation, ConfirmationPolicy, TransactionSigner, TxRequest};
use crate::config::ChainInfo;
use crate::error::FlipError;
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use eyre::{Context, Result};
use std::sync::Arc;

/// Local signer using a private key
#[derive(Clone)]
pub struct LocalSigner {
    /// Provider with wallet filler - handles nonce, gas, chain_id, and signing
    provider: Arc<dyn Provider<Ethereum>>,
    address: Address,
    policy: ConfirmationPolicy,
}

impl LocalSigner {
    /// Create a new LocalSigner from a private key hex string
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let signer = LocalSigner::from_private_key("0x...", "https://mainnet.base.org")?;
    /// ```
    pub fn from_private_key(private_key: impl AsRef<str>, rpc_url: impl AsRef<str>) -> Result<Self> {
        Self::new(parse_private_key(private_key.as_ref())?, rpc_url)
    }

    /// Create a signer for `key` talking to `rpc_url`
    pub fn new(key: PrivateKeySigner, rpc_url: impl AsRef<str>) -> Result<Self> {
        let address = key.address();
        let url: Url = rpc_url.as_ref().parse().context("Invalid RPC URL")?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(key))
            .connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
            address,
            policy: ConfirmationPolicy::default(),
        })
    }

    /// Override how receipts are awaited
    pub fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_and_send(&self, tx: TxRequest) -> Result<TxHash> {
        let mut tx_request = alloy::rpc::types::TransactionRequest::default()
            .with_to(tx.to)
            .with_value(tx.value)
            .with_input(tx.data);

        if let Some(gas_limit) = tx.gas_limit {
            tx_request = tx_request.with_gas_limit(gas_limit);
        }

        // Provider fills nonce, gas and chain_id, then signs
        let pending_tx = self
            .provider
            .send_transaction(tx_request)
            .await
            .context("Failed to send transaction")?;

        Ok(*pending_tx.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Confirmation> {
        poll_receipt(&*self.provider, tx_hash, self.policy).await
    }

    async fn get_balance(&self) -> Result<U256> {
        let balance: U256 = self
            .provider
            .get_balance(self.address)
            .await
            .context("Failed to get balance")?;

        Ok(balance)
    }
}

/// Approval prompt shown when an app asks for the wallet's account
pub type Authorizer = Arc<dyn Fn(Address) -> bool + Send + Sync>;

/// A wallet holding one private key
///
/// This is the injected provider of the terminal panel: the key comes from the
/// environment and `authorizer` plays the part of the wallet's connect prompt.
#[derive(Clone)]
pub struct KeyWallet {
    key: PrivateKeySigner,
    authorizer: Option<Authorizer>,
    policy: ConfirmationPolicy,
}

impl KeyWallet {
    pub fn new(key: PrivateKeySigner) -> Self {
        Self {
            key,
            authorizer: None,
            policy: ConfirmationPolicy::default(),
        }
    }

    /// Wallet from `PRIVATE_KEY`, or `None` when no key is configured
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var("PRIVATE_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Some(Self::new(parse_private_key(&key)?))),
            _ => Ok(None),
        }
    }

    /// Ask `authorizer` before exposing the account
    pub fn with_authorizer(mut self, authorizer: impl Fn(Address) -> bool + Send + Sync + 'static) -> Self {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    pub fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn address(&self) -> Address {
        self.key.address()
    }
}

impl WalletProvider for KeyWallet {
    type Signer = LocalSigner;

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let address = self.key.address();
        match &self.authorizer {
            Some(authorize) if !authorize(address) => Err(FlipError::UserRejected.into()),
            _ => Ok(vec![address]),
        }
    }

    fn signer_for(&self, account: Address, chain: &ChainInfo) -> Result<LocalSigner> {
        eyre::ensure!(
            account == self.key.address(),
            "Account {} is not held by this wallet",
            account
        );
        Ok(LocalSigner::new(self.key.clone(), &chain.rpc_url)?.with_confirmation_policy(self.policy))
    }
}

fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner> {
    let key = private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse().context("Failed to parse private key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::SignerSession;

    // Hardhat account #0
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn wallet() -> KeyWallet {
        KeyWallet::new(parse_private_key(TEST_KEY).unwrap())
    }

    #[test]
    fn test_local_signer_address() {
        let signer = LocalSigner::from_private_key(TEST_KEY, "http://localhost:8545").unwrap();
        assert_eq!(signer.address(), TEST_ADDRESS.parse::<Address>().unwrap());
    }

    #[test]
    fn test_bad_key_rejected() {
        assert!(LocalSigner::from_private_key("0x1234", "http://localhost:8545").is_err());
    }

    #[tokio::test]
    async fn test_key_wallet_session() {
        let chain = ChainInfo::base("http://localhost:8545");
        let session = SignerSession::acquire(Some(&wallet()), &chain).await.unwrap();
        assert_eq!(session.address(), TEST_ADDRESS.parse::<Address>().unwrap());
        assert_eq!(session.chain_id(), chain.chain_id);
    }

    #[tokio::test]
    async fn test_key_wallet_declined() {
        let wallet = wallet().with_authorizer(|_| false);
        let err = wallet.request_accounts().await.unwrap_err();
        assert_eq!(FlipError::of(&err), Some(&FlipError::UserRejected));
    }

    #[test]
    fn test_key_wallet_refuses_foreign_account() {
        let chain = ChainInfo::base("http://localhost:8545");
        assert!(wallet().signer_for(Address::ZERO, &chain).is_err());
    }
}
