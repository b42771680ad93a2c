//! In-memory chain, signer and wallet used by the unit tests

use crate::config::ChainInfo;
use crate::contracts::{ICoinFlip, IERC20};
use crate::error::{FlipError, Report, Result};
use crate::signer::{Confirmation, TransactionSigner, TxRequest, WalletProvider};
use crate::chain::ChainReader;
use alloy::primitives::{keccak256, Address, Bytes, Log, TxHash, U256};
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn addr(n: u8) -> Address {
    Address::with_last_byte(n)
}

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    bet_status: HashMap<U256, (bool, bool)>,
    outcomes: HashMap<U256, (bool, bool, U256)>,
    offline: bool,
    fail_with: Option<FlipError>,
    reads: usize,
    sent: Vec<TxRequest>,
    receipts: HashMap<TxHash, Confirmation>,
    reverting: HashSet<[u8; 4]>,
    rejecting: HashSet<[u8; 4]>,
    silent_flip: bool,
    stalled: bool,
    next_request_id: u64,
}

/// Shared fake chain; clones and the signers it hands out see the same state
#[derive(Clone, Default)]
pub struct MockReader {
    state: Arc<Mutex<ChainState>>,
}

impl MockReader {
    fn with_state(self, f: impl FnOnce(&mut ChainState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_balance(self, token: Address, owner: Address, amount: U256) -> Self {
        self.with_state(|s| {
            s.balances.insert((token, owner), amount);
        })
    }

    pub fn with_allowance(
        self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Self {
        self.with_state(|s| {
            s.allowances.insert((token, owner, spender), amount);
        })
    }

    pub fn with_bet(self, request_id: U256, status: (bool, bool), outcome: (bool, bool, U256)) -> Self {
        self.with_state(|s| {
            s.bet_status.insert(request_id, status);
            s.outcomes.insert(request_id, outcome);
        })
    }

    /// Every read fails with `RpcUnavailable`
    pub fn offline(self) -> Self {
        self.with_state(|s| s.offline = true)
    }

    /// Every read fails with `err`
    pub fn failing_with(self, err: FlipError) -> Self {
        self.with_state(|s| s.fail_with = Some(err))
    }

    /// Transactions calling `selector` are mined with a failed status
    pub fn reverting(self, selector: [u8; 4]) -> Self {
        self.with_state(|s| {
            s.reverting.insert(selector);
        })
    }

    /// The wallet refuses to sign transactions calling `selector`
    pub fn rejecting(self, selector: [u8; 4]) -> Self {
        self.with_state(|s| {
            s.rejecting.insert(selector);
        })
    }

    /// Flips succeed without emitting `BetSent`
    pub fn silent_flip(self) -> Self {
        self.with_state(|s| s.silent_flip = true)
    }

    /// Transactions are accepted but their receipts never arrive
    pub fn stalled(self) -> Self {
        self.with_state(|s| s.stalled = true)
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        let state = self.state.lock().unwrap();
        state
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn signer(&self, address: Address) -> MockSigner {
        MockSigner {
            address,
            chain: self.clone(),
        }
    }

    fn answer(state: &ChainState, to: Address, data: &[u8]) -> Result<Vec<u8>> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| eyre::eyre!("calldata too short"))?;

        let encoded = match selector {
            IERC20::balanceOfCall::SELECTOR => {
                let call = IERC20::balanceOfCall::abi_decode(data)?;
                let balance = state.balances.get(&(to, call.account)).copied();
                balance.unwrap_or_default().abi_encode()
            }
            IERC20::allowanceCall::SELECTOR => {
                let call = IERC20::allowanceCall::abi_decode(data)?;
                let allowance = state.allowances.get(&(to, call.owner, call.spender)).copied();
                allowance.unwrap_or_default().abi_encode()
            }
            ICoinFlip::getBetStatusCall::SELECTOR => {
                let call = ICoinFlip::getBetStatusCall::abi_decode(data)?;
                let status = state.bet_status.get(&call.requestId).copied();
                status.unwrap_or_default().abi_encode_params()
            }
            ICoinFlip::getGameOutcomeCall::SELECTOR => {
                let call = ICoinFlip::getGameOutcomeCall::abi_decode(data)?;
                let outcome = state.outcomes.get(&call.requestId).copied();
                outcome.unwrap_or_default().abi_encode_params()
            }
            other => eyre::bail!("unexpected eth_call selector {:?}", other),
        };
        Ok(encoded)
    }
}

impl ChainReader for MockReader {
    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if state.offline {
            return Err(Report::new(FlipError::RpcUnavailable {
                reason: "mock offline".to_string(),
            }));
        }
        if let Some(err) = state.fail_with.clone() {
            return Err(err.into());
        }
        Self::answer(&state, to, &data).map(Bytes::from)
    }
}

/// Signer that "mines" into the shared [`MockReader`] state
#[derive(Clone)]
pub struct MockSigner {
    address: Address,
    chain: MockReader,
}

impl MockSigner {
    fn mine(&self, state: &mut ChainState, tx: &TxRequest) -> Result<Confirmation> {
        let selector = tx.selector().unwrap_or_default();
        let tx_hash = keccak256((state.sent.len() as u64).to_be_bytes());
        let success = !state.reverting.contains(&selector);
        let mut logs = Vec::new();

        if success {
            match selector {
                IERC20::approveCall::SELECTOR => {
                    let call = IERC20::approveCall::abi_decode(&tx.data)?;
                    state
                        .allowances
                        .insert((tx.to, self.address, call.spender), call.amount);
                }
                ICoinFlip::flipCall::SELECTOR if !state.silent_flip => {
                    let call = ICoinFlip::flipCall::abi_decode(&tx.data)?;
                    state.next_request_id += 1;
                    let event = ICoinFlip::BetSent {
                        requestId: U256::from(state.next_request_id),
                        player: self.address,
                        face: call.face,
                        token: call.token,
                        amount: call.amount,
                    };
                    logs.push(Log {
                        address: tx.to,
                        data: event.encode_log_data(),
                    });
                }
                _ => {}
            }
        }

        Ok(Confirmation {
            tx_hash,
            success,
            logs,
        })
    }
}

impl TransactionSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_and_send(&self, tx: TxRequest) -> Result<TxHash> {
        let mut state = self.chain.state.lock().unwrap();
        if state.rejecting.contains(&tx.selector().unwrap_or_default()) {
            return Err(eyre::eyre!("user rejected transaction (ACTION_REJECTED)"));
        }
        let confirmation = self.mine(&mut state, &tx)?;
        let tx_hash = confirmation.tx_hash;
        state.sent.push(tx);
        state.receipts.insert(tx_hash, confirmation);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Confirmation> {
        let stalled = self.chain.state.lock().unwrap().stalled;
        if stalled {
            return std::future::pending().await;
        }
        let state = self.chain.state.lock().unwrap();
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| eyre::eyre!("unknown transaction {}", tx_hash))
    }

    async fn get_balance(&self) -> Result<U256> {
        Ok(ether(1))
    }
}

/// Wallet provider handing out [`MockSigner`]s
pub struct MockWallet {
    account: Address,
    chain: MockReader,
    declining: bool,
    requests: AtomicUsize,
}

impl MockWallet {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            chain: MockReader::default(),
            declining: false,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn declining(mut self) -> Self {
        self.declining = true;
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl WalletProvider for MockWallet {
    type Signer = MockSigner;

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.declining {
            return Err(FlipError::UserRejected.into());
        }
        Ok(vec![self.account])
    }

    fn signer_for(&self, account: Address, _chain: &ChainInfo) -> Result<MockSigner> {
        Ok(self.chain.signer(account))
    }
}
