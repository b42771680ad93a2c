//! Configuration for the flipit SDK, frame server and wallet panel
//!
//! Everything is read from environment variables once at start-up. The
//! `from_lookup` constructors take any key lookup so configuration can be
//! built from a map in tests.

use crate::constants::{
    parse_token_amount, BASE_CHAIN_ID, BASE_SEPOLIA_CHAIN_ID, DEFAULT_FRAME_AMOUNT,
    DEFAULT_FRAME_ENDPOINT, DEFAULT_FRAME_TOKEN, DEFAULT_IMAGE_BASE_URL, TOKEN_DECIMALS,
};
use crate::error::{FlipError, Result};
use crate::signer::ConfirmationPolicy;
use alloy::primitives::Address;
use eyre::{bail, eyre, Context};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";
const DEFAULT_FALLBACK_RPC_URL: &str = "https://base-rpc.publicnode.com";
const BASE_SEPOLIA_RPC_URL: &str = "https://sepolia.base.org";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_FORDEFI_CHAIN: &str = "base_mainnet";
const FRAME_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_FRAME_CONFIRMATION_POLLS: u32 = 90;
const DEFAULT_FRAME_LOCK_WAIT: Duration = Duration::from_secs(30);

/// A wager token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: impl Into<String>, address: Address) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            address,
            decimals: TOKEN_DECIMALS,
        }
    }
}

/// Supported tokens keyed by upper-case symbol
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTable {
    tokens: BTreeMap<String, Token>,
}

impl TokenTable {
    /// Parse `SYMBOL=0xaddress` pairs separated by commas
    pub fn parse(entries: &str) -> Result<Self> {
        let mut table = Self::default();
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (symbol, address) = entry
                .split_once('=')
                .ok_or_else(|| eyre!("Token entry must be SYMBOL=ADDRESS, got {:?}", entry))?;
            let symbol = symbol.trim();
            if symbol.is_empty() {
                bail!("Token entry {:?} has an empty symbol", entry);
            }
            let address: Address = address
                .trim()
                .parse()
                .with_context(|| format!("Invalid address for token {}", symbol))?;
            table.insert(Token::new(symbol, address));
        }
        Ok(table)
    }

    pub fn insert(&mut self, token: Token) {
        self.tokens.insert(token.symbol.clone(), token);
    }

    /// Look up a token by symbol, case-insensitively
    pub fn get(&self, symbol: &str) -> Result<&Token> {
        self.tokens
            .get(&symbol.trim().to_uppercase())
            .ok_or_else(|| FlipError::UnknownToken(symbol.to_string()).into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A network the wallet panel can switch to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInfo {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

impl ChainInfo {
    pub fn base(rpc_url: impl Into<String>) -> Self {
        Self {
            name: "Base".to_string(),
            chain_id: BASE_CHAIN_ID,
            rpc_url: rpc_url.into(),
        }
    }

    pub fn base_sepolia() -> Self {
        Self {
            name: "Base Sepolia".to_string(),
            chain_id: BASE_SEPOLIA_CHAIN_ID,
            rpc_url: BASE_SEPOLIA_RPC_URL.to_string(),
        }
    }
}

impl fmt::Display for ChainInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}

/// Network configuration containing RPC URLs, the wager contract and tokens
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Chain ID (8453 for Base)
    pub chain_id: u64,
    /// Primary RPC endpoint URL
    pub rpc_url: String,
    /// Secondary RPC endpoint, tried when the primary is unreachable
    pub fallback_rpc_url: Option<String>,
    /// Coin flip contract address
    pub coinflip: Address,
    /// Supported wager tokens
    pub tokens: TokenTable,
    /// Networks offered by the wallet panel; the first one is the default
    pub networks: Vec<ChainInfo>,
}

impl NetworkConfig {
    /// Configuration for a contract on Base mainnet with public RPC endpoints
    pub fn base(coinflip: Address) -> Self {
        Self {
            chain_id: BASE_CHAIN_ID,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            fallback_rpc_url: Some(DEFAULT_FALLBACK_RPC_URL.to_string()),
            coinflip,
            tokens: TokenTable::default(),
            networks: vec![ChainInfo::base(DEFAULT_RPC_URL), ChainInfo::base_sepolia()],
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`
    ///
    /// `FLIP_CONTRACT` is required. `FLIP_RPC_URL`, `FLIP_FALLBACK_RPC_URL`
    /// (empty disables it), `FLIP_CHAIN_ID` and `FLIP_TOKENS` are optional.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let coinflip: Address = lookup("FLIP_CONTRACT")
            .ok_or_else(|| eyre!("FLIP_CONTRACT environment variable must be set"))?
            .trim()
            .parse()
            .context("Invalid FLIP_CONTRACT address")?;

        let mut config = Self::base(coinflip);

        if let Some(rpc_url) = lookup("FLIP_RPC_URL") {
            config = config.with_rpc_url(rpc_url);
        }
        if let Some(fallback) = lookup("FLIP_FALLBACK_RPC_URL") {
            let fallback = fallback.trim().to_string();
            config.fallback_rpc_url = (!fallback.is_empty()).then_some(fallback);
        }
        if let Some(chain_id) = lookup("FLIP_CHAIN_ID") {
            config.chain_id = chain_id
                .trim()
                .parse()
                .context("FLIP_CHAIN_ID must be an integer")?;
            config.networks[0].chain_id = config.chain_id;
        }
        if let Some(tokens) = lookup("FLIP_TOKENS") {
            config.tokens = TokenTable::parse(&tokens).context("Invalid FLIP_TOKENS")?;
        }

        Ok(config)
    }

    /// Replace the primary RPC URL (also used by the default network)
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self.networks[0].rpc_url = self.rpc_url.clone();
        self
    }

    /// Add a supported token
    pub fn with_token(mut self, token: Token) -> Self {
        self.tokens.insert(token);
        self
    }

    /// Look up a configured token by symbol
    pub fn token(&self, symbol: &str) -> Result<&Token> {
        self.tokens.get(symbol)
    }
}

/// Which custodial signer the frame server flips with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSignerMode {
    /// Server-held private key from `PRIVATE_KEY`
    Local,
    /// Fordefi MPC vault
    Fordefi,
}

impl FromStr for FrameSignerMode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "fordefi" => Ok(Self::Fordefi),
            other => bail!("Unknown frame signer {:?}, expected \"local\" or \"fordefi\"", other),
        }
    }
}

/// Settings of the frame endpoint
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Public URL of this endpoint, the "Play Again" target
    pub endpoint_url: String,
    /// Base URL of the result images
    pub image_base_url: String,
    /// Symbol of the token wagered by frame flips
    pub token: String,
    /// Wager per frame flip, in whole tokens
    pub amount: String,
    /// Socket address the server listens on
    pub bind_addr: String,
    /// Custodial signer choice; the server will not start without one
    pub signer: Option<FrameSignerMode>,
    /// Receipt polls (2s apart) before a frame flip is given up
    pub confirmation_polls: u32,
    /// How long a request waits for the previous flip of the server account
    pub lock_wait: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_FRAME_ENDPOINT.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            token: DEFAULT_FRAME_TOKEN.to_string(),
            amount: DEFAULT_FRAME_AMOUNT.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            signer: None,
            confirmation_polls: DEFAULT_FRAME_CONFIRMATION_POLLS,
            lock_wait: DEFAULT_FRAME_LOCK_WAIT,
        }
    }
}

impl FrameConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let amount = lookup("FRAME_AMOUNT").unwrap_or(defaults.amount);
        // Reject a bad wager at start-up rather than on the first click
        parse_token_amount(&amount).context("Invalid FRAME_AMOUNT")?;

        let signer = lookup("FRAME_SIGNER")
            .map(|mode| mode.parse::<FrameSignerMode>())
            .transpose()?;

        let confirmation_polls = match lookup("FRAME_CONFIRMATION_POLLS") {
            Some(polls) => polls
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|polls| *polls > 0)
                .ok_or_else(|| eyre!("FRAME_CONFIRMATION_POLLS must be a positive integer"))?,
            None => defaults.confirmation_polls,
        };
        let lock_wait = match lookup("FRAME_LOCK_WAIT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.trim()
                    .parse()
                    .context("FRAME_LOCK_WAIT_SECS must be an integer")?,
            ),
            None => defaults.lock_wait,
        };

        Ok(Self {
            endpoint_url: lookup("FRAME_ENDPOINT_URL").unwrap_or(defaults.endpoint_url),
            image_base_url: lookup("FRAME_IMAGE_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.image_base_url),
            token: lookup("FRAME_TOKEN").unwrap_or(defaults.token),
            amount,
            bind_addr: lookup("FRAME_BIND_ADDR").unwrap_or(defaults.bind_addr),
            signer,
            confirmation_polls,
            lock_wait,
        })
    }

    /// Receipt polling for the server signer; never unbounded
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::bounded(FRAME_POLL_INTERVAL, self.confirmation_polls)
    }

    /// The configured signer mode, or an error explaining how to set one
    pub fn require_signer(&self) -> Result<FrameSignerMode> {
        self.signer.ok_or_else(|| {
            eyre!("FRAME_SIGNER must be set to \"local\" or \"fordefi\" to flip server-side")
        })
    }
}

/// Credentials of the Fordefi custodial signer
#[derive(Clone)]
pub struct FordefiConfig {
    /// JWT access token of the API user
    pub access_token: String,
    /// P-256 private key (PEM) of the API signer
    pub private_key_pem: String,
    /// Vault address; the first EVM vault is used when unset
    pub address: Option<Address>,
    /// Fordefi chain name
    pub chain: String,
}

impl fmt::Debug for FordefiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FordefiConfig")
            .field("address", &self.address)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl FordefiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let access_token = lookup("FORDEFI_ACCESS_TOKEN")
            .ok_or_else(|| eyre!("FORDEFI_ACCESS_TOKEN environment variable must be set"))?;
        let private_key_pem = lookup("FORDEFI_PRIVATE_KEY")
            .ok_or_else(|| eyre!("FORDEFI_PRIVATE_KEY environment variable must be set"))?;
        let address = lookup("FORDEFI_ADDRESS")
            .map(|a| a.trim().parse::<Address>())
            .transpose()
            .context("Invalid FORDEFI_ADDRESS")?;

        Ok(Self {
            access_token,
            private_key_pem,
            address,
            chain: lookup("FORDEFI_CHAIN").unwrap_or_else(|| DEFAULT_FORDEFI_CHAIN.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CONTRACT: &str = "0x1111111111111111111111111111111111111111";
    const TOKEN: &str = "0x2222222222222222222222222222222222222222";

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_token_table_parse() {
        let table = TokenTable::parse(&format!("stableai={TOKEN}, USDC = {CONTRACT}")).unwrap();
        let token = table.get("STABLEAI").unwrap();
        assert_eq!(token.address, TOKEN.parse::<Address>().unwrap());
        assert_eq!(token.decimals, 18);
        assert!(table.get("usdc").is_ok());
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn test_token_table_rejects_malformed_entries() {
        assert!(TokenTable::parse("STABLEAI").is_err());
        assert!(TokenTable::parse("STABLEAI=0x1234").is_err());
        assert!(TokenTable::parse(&format!("={TOKEN}")).is_err());
    }

    #[test]
    fn test_unknown_token_is_typed() {
        let err = TokenTable::default().get("DOGE").unwrap_err();
        assert_eq!(
            FlipError::of(&err),
            Some(&FlipError::UnknownToken("DOGE".to_string()))
        );
    }

    #[test]
    fn test_network_config_requires_contract() {
        assert!(NetworkConfig::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_network_config_from_lookup() {
        let tokens = format!("STABLEAI={TOKEN}");
        let vars = [
            ("FLIP_CONTRACT", CONTRACT),
            ("FLIP_RPC_URL", "http://localhost:8545"),
            ("FLIP_FALLBACK_RPC_URL", ""),
            ("FLIP_TOKENS", tokens.as_str()),
        ];
        let config = NetworkConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.coinflip, CONTRACT.parse::<Address>().unwrap());
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.networks[0].rpc_url, "http://localhost:8545");
        assert_eq!(config.fallback_rpc_url, None);
        assert_eq!(config.chain_id, BASE_CHAIN_ID);
        assert!(config.token("stableai").is_ok());
    }

    #[test]
    fn test_frame_config_defaults() {
        let config = FrameConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.endpoint_url, DEFAULT_FRAME_ENDPOINT);
        assert_eq!(config.amount, "1");
        assert_eq!(config.token, "STABLEAI");
        assert!(config.signer.is_none());
        assert!(config.require_signer().is_err());
        assert_eq!(config.confirmation_policy().max_attempts, Some(90));
        assert_eq!(config.lock_wait, Duration::from_secs(30));
    }

    #[test]
    fn test_frame_config_bounds_waiting() {
        let config = FrameConfig::from_lookup(lookup(&[
            ("FRAME_CONFIRMATION_POLLS", "15"),
            ("FRAME_LOCK_WAIT_SECS", "5"),
        ]))
        .unwrap();
        let policy = config.confirmation_policy();
        assert_eq!(policy.max_attempts, Some(15));
        assert_eq!(policy.poll_interval, Duration::from_secs(2));
        assert_eq!(config.lock_wait, Duration::from_secs(5));

        assert!(FrameConfig::from_lookup(lookup(&[("FRAME_CONFIRMATION_POLLS", "0")])).is_err());
        assert!(FrameConfig::from_lookup(lookup(&[("FRAME_LOCK_WAIT_SECS", "soon")])).is_err());
    }

    #[test]
    fn test_frame_config_signer_mode() {
        let config = FrameConfig::from_lookup(lookup(&[
            ("FRAME_SIGNER", "Fordefi"),
            ("FRAME_IMAGE_BASE_URL", "https://cdn.example.org/"),
        ]))
        .unwrap();
        assert_eq!(config.require_signer().unwrap(), FrameSignerMode::Fordefi);
        assert_eq!(config.image_base_url, "https://cdn.example.org");

        assert!(FrameConfig::from_lookup(lookup(&[("FRAME_SIGNER", "browser")])).is_err());
        assert!(FrameConfig::from_lookup(lookup(&[("FRAME_AMOUNT", "zero")])).is_err());
    }

    #[test]
    fn test_fordefi_config_debug_hides_secrets() {
        let config = FordefiConfig::from_lookup(lookup(&[
            ("FORDEFI_ACCESS_TOKEN", "secret-token"),
            ("FORDEFI_PRIVATE_KEY", "secret-key"),
        ]))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert_eq!(config.chain, "base_mainnet");
    }
}
