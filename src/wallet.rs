//! Wallet connection state for the player-facing panel

use crate::config::ChainInfo;
use crate::error::Result;
use crate::signer::{SignerSession, WalletProvider};
use alloy::primitives::Address;
use eyre::{ensure, eyre};
use std::fmt;

/// What the panel shows next to the "Open" button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletStatus {
    Disconnected,
    Connected { address: Address, network: ChainInfo },
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletStatus::Disconnected => write!(f, "Disconnected"),
            WalletStatus::Connected { address, network } => {
                write!(f, "Connected as {} on {}", address, network)
            }
        }
    }
}

/// Connect/disconnect/switch-network state machine over an injected wallet
///
/// A session is bound to one address on one network; changing either drops it
/// and the player has to connect again.
pub struct WalletPanel<P: WalletProvider> {
    provider: Option<P>,
    networks: Vec<ChainInfo>,
    active: usize,
    session: Option<SignerSession<P::Signer>>,
}

impl<P: WalletProvider> WalletPanel<P> {
    /// Panel over `provider` (`None` when no wallet is installed)
    ///
    /// The first entry of `networks` is selected initially.
    pub fn new(provider: Option<P>, networks: Vec<ChainInfo>) -> Result<Self> {
        ensure!(!networks.is_empty(), "At least one network must be configured");
        Ok(Self {
            provider,
            networks,
            active: 0,
            session: None,
        })
    }

    /// Open the wallet and bind a session on the active network
    ///
    /// Already connected panels return the existing session.
    pub async fn connect(&mut self) -> Result<&SignerSession<P::Signer>> {
        if self.session.is_none() {
            let network = &self.networks[self.active];
            let session = SignerSession::acquire(self.provider.as_ref(), network).await?;
            self.session = Some(session);
            self.log_status();
        }
        self.session
            .as_ref()
            .ok_or_else(|| eyre!("wallet session missing after connect"))
    }

    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            self.log_status();
        }
    }

    /// Select `networks[index]`; an open session on another network is dropped
    pub fn switch_network(&mut self, index: usize) -> Result<&ChainInfo> {
        ensure!(
            index < self.networks.len(),
            "Unknown network {}, {} configured",
            index,
            self.networks.len()
        );
        if index != self.active {
            self.active = index;
            tracing::info!(network = %self.networks[index], "Network switched");
            self.disconnect();
        }
        Ok(&self.networks[self.active])
    }

    /// The wallet reported a new active account
    pub fn account_changed(&mut self, address: Address) {
        let stale = self
            .session
            .as_ref()
            .is_some_and(|session| session.address() != address);
        if stale {
            tracing::info!(%address, "Wallet account changed");
            self.disconnect();
        }
    }

    pub fn status(&self) -> WalletStatus {
        match &self.session {
            Some(session) => WalletStatus::Connected {
                address: session.address(),
                network: self.networks[self.active].clone(),
            },
            None => WalletStatus::Disconnected,
        }
    }

    pub fn session(&self) -> Option<&SignerSession<P::Signer>> {
        self.session.as_ref()
    }

    pub fn active_network(&self) -> &ChainInfo {
        &self.networks[self.active]
    }

    pub fn networks(&self) -> &[ChainInfo] {
        &self.networks
    }

    fn log_status(&self) {
        tracing::info!(status = %self.status(), "Wallet status");
    }
}
