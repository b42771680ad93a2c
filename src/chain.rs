//! Read-only chain access
//!
//! [`ChainReader`] is the read path used before every spend: token balances,
//! allowances and the wager contract's view functions. Reads are idempotent and
//! safe to retry; [`FallbackReader`] retries them against a second endpoint.

use crate::config::NetworkConfig;
use crate::contracts::IERC20;
use crate::error::{FlipError, Report, Result};
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use eyre::Context;
use std::future::Future;
use std::sync::Arc;

/// Rounds over (primary, fallback) before giving up
pub const DEFAULT_READ_ROUNDS: usize = 2;

/// Trait for read-only contract calls
pub trait ChainReader: Send + Sync {
    /// Performs an `eth_call` and returns the raw return data
    ///
    /// Transport failures must be reported as [`FlipError::RpcUnavailable`].
    fn eth_call(&self, to: Address, data: Bytes) -> impl Future<Output = Result<Bytes>> + Send;

    /// Calls a typed view function and decodes its return value
    fn view<C>(&self, to: Address, call: C) -> impl Future<Output = Result<C::Return>> + Send
    where
        C: SolCall + Send + Sync,
        C::Return: Send,
    {
        async move {
            let result = self.eth_call(to, Bytes::from(call.abi_encode())).await?;
            C::abi_decode_returns(&result).map_err(|e| {
                Report::new(FlipError::RpcUnavailable {
                    reason: format!("Failed to decode {} result: {}", C::SIGNATURE, e),
                })
            })
        }
    }

    /// Token balance of `owner`
    fn read_balance(
        &self,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = Result<U256>> + Send {
        self.view(token, IERC20::balanceOfCall { account: owner })
    }

    /// Amount `spender` may currently pull from `owner`
    fn read_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256>> + Send {
        self.view(token, IERC20::allowanceCall { owner, spender })
    }
}

/// Reader backed by a single JSON-RPC endpoint
#[derive(Clone)]
pub struct RpcReader {
    url: String,
    provider: Arc<RootProvider<Ethereum>>,
}

impl RpcReader {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url: Url = rpc_url.parse().context("Invalid RPC URL")?;
        // Read-only provider without fillers (we only do eth_call operations)
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_http(url);

        Ok(Self {
            url: rpc_url.to_string(),
            provider: Arc::new(provider),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChainReader for RpcReader {
    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.provider
            .call(TransactionRequest::default().with_to(to).with_input(data))
            .await
            .map_err(|e| {
                Report::new(FlipError::RpcUnavailable {
                    reason: format!("{}: {}", self.url, e),
                })
            })
    }
}

/// Primary reader with a secondary to fall back on
///
/// Only [`FlipError::RpcUnavailable`] triggers a retry; other failures are
/// returned immediately. Attempts alternate primary, fallback, primary, ...
/// for at most `rounds` rounds.
#[derive(Clone)]
pub struct FallbackReader<R> {
    primary: R,
    fallback: Option<R>,
    rounds: usize,
}

impl<R: ChainReader> FallbackReader<R> {
    pub fn new(primary: R, fallback: Option<R>) -> Self {
        Self {
            primary,
            fallback,
            rounds: DEFAULT_READ_ROUNDS,
        }
    }

    /// Set how many rounds to try before giving up (at least one)
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds.max(1);
        self
    }

    fn endpoints(&self) -> impl Iterator<Item = &R> {
        std::iter::once(&self.primary).chain(self.fallback.as_ref())
    }
}

impl FallbackReader<RpcReader> {
    /// Build the reader pair from the configured endpoints
    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        let primary = RpcReader::new(&config.rpc_url)?;
        let fallback = config
            .fallback_rpc_url
            .as_deref()
            .map(RpcReader::new)
            .transpose()?;
        Ok(Self::new(primary, fallback))
    }
}

impl<R: ChainReader> ChainReader for FallbackReader<R> {
    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let mut last_err = None;

        for round in 0..self.rounds {
            for (idx, reader) in self.endpoints().enumerate() {
                match reader.eth_call(to, data.clone()).await {
                    Ok(result) => return Ok(result),
                    Err(err) if is_unavailable(&err) => {
                        tracing::warn!(round, endpoint = idx, "RPC read failed: {:#}", err);
                        last_err = Some(err);
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            Report::new(FlipError::RpcUnavailable {
                reason: "no RPC endpoint configured".to_string(),
            })
        }))
    }
}

fn is_unavailable(err: &Report) -> bool {
    FlipError::is(err, |e| matches!(e, FlipError::RpcUnavailable { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{addr, ether, MockReader};

    #[tokio::test]
    async fn test_typed_reads_decode_mock_state() {
        let reader = MockReader::default()
            .with_balance(addr(0x70), addr(1), ether(5))
            .with_allowance(addr(0x70), addr(1), addr(0xc0), ether(3));

        assert_eq!(reader.read_balance(addr(0x70), addr(1)).await.unwrap(), ether(5));
        assert_eq!(
            reader.read_allowance(addr(0x70), addr(1), addr(0xc0)).await.unwrap(),
            ether(3)
        );
        // Unknown accounts read as zero, like an ERC20
        assert_eq!(reader.read_balance(addr(0x70), addr(9)).await.unwrap(), U256::ZERO);
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_unavailable() {
        let primary = MockReader::default().offline();
        let fallback = MockReader::default().with_balance(addr(0x70), addr(1), ether(1));
        let reader = FallbackReader::new(primary.clone(), Some(fallback.clone()));

        let balance = reader.read_balance(addr(0x70), addr(1)).await.unwrap();
        assert_eq!(balance, ether(1));
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_attempts_are_bounded() {
        let primary = MockReader::default().offline();
        let fallback = MockReader::default().offline();
        let reader =
            FallbackReader::new(primary.clone(), Some(fallback.clone())).with_rounds(3);

        let err = reader.read_balance(addr(0x70), addr(1)).await.unwrap_err();
        assert!(is_unavailable(&err));
        assert_eq!(primary.calls(), 3);
        assert_eq!(fallback.calls(), 3);
    }

    #[tokio::test]
    async fn test_fallback_not_used_for_other_errors() {
        let primary = MockReader::default().failing_with(FlipError::UserRejected);
        let fallback = MockReader::default();
        let reader = FallbackReader::new(primary.clone(), Some(fallback.clone()));

        tokio_test::assert_err!(reader.read_balance(addr(0x70), addr(1)).await);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[test]
    fn test_rpc_reader_rejects_bad_url() {
        assert!(RpcReader::new("not a url").is_err());
        assert_eq!(
            RpcReader::new("http://localhost:8545").unwrap().url(),
            "http://localhost:8545"
        );
    }
}
