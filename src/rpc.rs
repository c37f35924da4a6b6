//! Chain RPC collaborator: simulate, send, signature status, balance
//!
//! [`ChainRpc`] is the seam between the trade executor / confirmation
//! poller and the network. [`SolanaRpc`] is the production implementation
//! over the nonblocking `RpcClient`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::{TransactionConfirmationStatus, UiTransactionEncoding};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Commitment level of a transaction, ordered weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    Processed,
    Confirmed,
    Finalized,
}

impl Finality {
    /// `true` once `self` is at least as strong as `target`
    pub fn satisfies(self, target: Finality) -> bool {
        self >= target
    }
}

impl From<TransactionConfirmationStatus> for Finality {
    fn from(status: TransactionConfirmationStatus) -> Self {
        match status {
            TransactionConfirmationStatus::Processed => Self::Processed,
            TransactionConfirmationStatus::Confirmed => Self::Confirmed,
            TransactionConfirmationStatus::Finalized => Self::Finalized,
        }
    }
}

impl fmt::Display for Finality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

impl FromStr for Finality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!("unknown finality: {}", other)),
        }
    }
}

/// Outcome of one simulation, as far as the executor cares
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReport {
    /// Transaction error in its JSON wire shape, e.g.
    /// `{"InstructionError":[3,{"Custom":6001}]}`
    pub err: Option<serde_json::Value>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

impl SimulationReport {
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

/// One signature status lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureState {
    /// On-chain execution error, if the transaction landed and failed
    pub err: Option<String>,
    pub finality: Option<Finality>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("RPC request failed: {0}")]
    Request(String),
    #[error("Unexpected RPC response: {0}")]
    InvalidResponse(String),
}

impl From<ClientError> for RpcError {
    fn from(e: ClientError) -> Self {
        Self::Request(e.to_string())
    }
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Simulate without signature verification, replacing the blockhash,
    /// at `processed` commitment
    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationReport, RpcError>;

    /// Broadcast a signed transaction with preflight skipped
    async fn send(&self, tx: &VersionedTransaction) -> Result<Signature, RpcError>;

    /// History-inclusive status lookup; `None` while the cluster has no record
    async fn signature_status(&self, signature: &Signature)
        -> Result<Option<SignatureState>, RpcError>;

    async fn balance(&self, address: &Pubkey) -> Result<u64, RpcError>;
}

/// Production [`ChainRpc`] over the Solana JSON-RPC client
pub struct SolanaRpc {
    client: Arc<RpcClient>,
    send_max_retries: usize,
}

impl SolanaRpc {
    pub fn new(client: Arc<RpcClient>, send_max_retries: usize) -> Self {
        Self {
            client,
            send_max_retries,
        }
    }

    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }

    fn simulation_config() -> RpcSimulateTransactionConfig {
        RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(CommitmentConfig::processed()),
            encoding: Some(UiTransactionEncoding::Base64),
            ..Default::default()
        }
    }

    fn send_config(&self) -> RpcSendTransactionConfig {
        RpcSendTransactionConfig {
            skip_preflight: true,
            max_retries: Some(self.send_max_retries),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ChainRpc for SolanaRpc {
    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationReport, RpcError> {
        let response = self
            .client
            .simulate_transaction_with_config(tx, Self::simulation_config())
            .await?;
        let result = response.value;
        let err = match result.err {
            Some(e) => Some(
                serde_json::to_value(&e).map_err(|e| RpcError::InvalidResponse(e.to_string()))?,
            ),
            None => None,
        };
        Ok(SimulationReport {
            err,
            logs: result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
        })
    }

    async fn send(&self, tx: &VersionedTransaction) -> Result<Signature, RpcError> {
        Ok(self
            .client
            .send_transaction_with_config(tx, self.send_config())
            .await?)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureState>, RpcError> {
        let response = self
            .client
            .get_signature_statuses_with_history(&[*signature])
            .await?;
        let status = response.value.into_iter().next().flatten();
        Ok(status.map(|status| SignatureState {
            err: status.err.as_ref().map(|e| format!("{:?}", e)),
            finality: status.confirmation_status.map(Finality::from),
        }))
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64, RpcError> {
        Ok(self.client.get_balance(address).await?)
    }
}
