//! Scripted in-memory collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use listing_sniper::pool_info::{PoolInfo, PoolInfoApi, PoolInfoError};
use listing_sniper::rpc::{ChainRpc, Finality, RpcError, SignatureState, SimulationReport};
use listing_sniper::sniffer::decoder::MARKET_DISCRIMINATOR;
use listing_sniper::sniffer::SnifferError;
use listing_sniper::streaming::{AccountNotification, ListingFilters, NotificationSource};
use listing_sniper::tx_builder::{Quote, QuoteRequest, SwapApi, SwapApiError, SwapParams};
use parking_lot::Mutex;
use serde_json::json;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::message::{Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// 243-byte market account, base64 encoded
pub fn market_payload(creator: &Pubkey, base_mint: &Pubkey, quote_mint: &Pubkey) -> String {
    let mut data = Vec::with_capacity(243);
    data.extend_from_slice(&MARKET_DISCRIMINATOR);
    data.push(254);
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(creator.as_ref());
    data.extend_from_slice(base_mint.as_ref());
    data.extend_from_slice(quote_mint.as_ref());
    for _ in 0..3 {
        data.extend_from_slice(Pubkey::new_unique().as_ref());
    }
    data.extend_from_slice(&1_000_000u64.to_le_bytes());
    data.resize(243, 0);
    BASE64.encode(data)
}

/// A wallet address: created by an ordinary signer
pub fn on_curve_creator() -> Pubkey {
    Keypair::new().pubkey()
}

/// A program-derived address: created through the canonical pool path
pub fn off_curve_creator() -> Pubkey {
    Pubkey::find_program_address(&[b"pool-authority"], &Pubkey::new_unique()).0
}

pub fn notification(account: Pubkey, payload: String) -> AccountNotification {
    AccountNotification {
        account,
        payload,
        slot: 1,
    }
}

pub fn filters(quote_mint: Pubkey) -> ListingFilters {
    ListingFilters {
        program_id: Pubkey::new_unique(),
        data_size: 243,
        discriminator: MARKET_DISCRIMINATOR,
        quote_mint,
        quote_mint_offset: 75,
        commitment: CommitmentConfig::confirmed(),
    }
}

/// One scripted session: what reconciliation returns and what the stream delivers
pub struct Session {
    pub existing: Vec<Pubkey>,
    pub notifications: Vec<AccountNotification>,
}

/// Pops one [`Session`] per subscribe; once exhausted the stream stays open
pub struct ScriptedSource {
    sessions: Mutex<VecDeque<Session>>,
    current_existing: Mutex<Vec<Pubkey>>,
    pub subscribes: Mutex<u32>,
    pub reconciles: Mutex<u32>,
}

impl ScriptedSource {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            current_existing: Mutex::new(Vec::new()),
            subscribes: Mutex::new(0),
            reconciles: Mutex::new(0),
        }
    }
}

#[async_trait]
impl NotificationSource for ScriptedSource {
    async fn subscribe(
        &self,
        _filters: &ListingFilters,
    ) -> Result<mpsc::UnboundedReceiver<AccountNotification>, SnifferError> {
        *self.subscribes.lock() += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        match self.sessions.lock().pop_front() {
            Some(session) => {
                *self.current_existing.lock() = session.existing;
                for n in session.notifications {
                    let _ = tx.send(n);
                }
            }
            None => {
                self.current_existing.lock().clear();
                std::mem::forget(tx);
            }
        }
        Ok(rx)
    }

    async fn reconcile(&self, _filters: &ListingFilters) -> Result<Vec<Pubkey>, SnifferError> {
        *self.reconciles.lock() += 1;
        Ok(self.current_existing.lock().clone())
    }
}

/// Swap API that records every quote and build
pub struct ScriptedSwap {
    payer: Pubkey,
    pub quotes: Mutex<Vec<QuoteRequest>>,
    pub builds: Mutex<u32>,
}

impl ScriptedSwap {
    pub fn new(payer: Pubkey) -> Self {
        Self {
            payer,
            quotes: Mutex::new(Vec::new()),
            builds: Mutex::new(0),
        }
    }
}

#[async_trait]
impl SwapApi for ScriptedSwap {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, SwapApiError> {
        self.quotes.lock().push(request.clone());
        Ok(Quote(json!({
            "inputMint": request.input_mint.to_string(),
            "outputMint": request.output_mint.to_string(),
            "outAmount": "1000000",
        })))
    }

    async fn build(
        &self,
        _quote: &Quote,
        _params: &SwapParams,
    ) -> Result<VersionedTransaction, SwapApiError> {
        *self.builds.lock() += 1;
        Ok(VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::Legacy(Message::new(&[], Some(&self.payer))),
        })
    }
}

pub fn clean_simulation() -> SimulationReport {
    SimulationReport {
        err: None,
        logs: vec!["Program log: Instruction: Buy".into()],
        units_consumed: Some(90_000),
    }
}

pub fn slippage_simulation() -> SimulationReport {
    SimulationReport {
        err: Some(json!({"InstructionError": [4, {"Custom": 6001}]})),
        logs: vec!["Program log: AnchorError occurred. Error Number: 6001".into()],
        units_consumed: None,
    }
}

/// Chain RPC that answers simulations from a script and finalizes every send
pub struct ScriptedRpc {
    simulations: Mutex<VecDeque<SimulationReport>>,
    fallback: SimulationReport,
    pub simulate_calls: Mutex<u32>,
    pub sent: Mutex<Vec<Signature>>,
}

impl ScriptedRpc {
    pub fn new(simulations: Vec<SimulationReport>, fallback: SimulationReport) -> Self {
        Self {
            simulations: Mutex::new(simulations.into()),
            fallback,
            simulate_calls: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChainRpc for ScriptedRpc {
    async fn simulate(&self, _tx: &VersionedTransaction) -> Result<SimulationReport, RpcError> {
        *self.simulate_calls.lock() += 1;
        let next = self.simulations.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    async fn send(&self, tx: &VersionedTransaction) -> Result<Signature, RpcError> {
        let signature = tx.signatures[0];
        self.sent.lock().push(signature);
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureState>, RpcError> {
        if self.sent.lock().contains(signature) {
            Ok(Some(SignatureState {
                err: None,
                finality: Some(Finality::Finalized),
            }))
        } else {
            Ok(None)
        }
    }

    async fn balance(&self, _address: &Pubkey) -> Result<u64, RpcError> {
        Ok(1_000_000_000)
    }
}

/// Pool API reporting fixed liquidity for every mint
pub struct StaticPools {
    pub liquidity_usd: f64,
}

#[async_trait]
impl PoolInfoApi for StaticPools {
    async fn pool_info(&self, _mint: &Pubkey) -> Result<PoolInfo, PoolInfoError> {
        Ok(PoolInfo {
            base_reserves: 200_000_000_000_000.0,
            quote_reserves: 84_000_000_000.0,
            base_mint_decimals: 6,
            quote_mint_decimals: 9,
            liquidity_usd: self.liquidity_usd,
            timestamp: None,
        })
    }
}
