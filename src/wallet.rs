//! Wallet management module

use crate::rpc::ChainRpc;
use anyhow::{Context, Result};
use solana_sdk::{
    native_token::lamports_to_sol,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    signer::SignerError,
    transaction::VersionedTransaction,
};
use std::path::Path;
use std::sync::Arc;

/// Wallet manager for handling the trading keypair and signing
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Create a new wallet manager from a keypair file
    ///
    /// Accepts the 64 raw secret bytes or the JSON byte array written by
    /// `solana-keygen`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let keypair_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path.display()))?;

        let secret = if keypair_bytes.len() == 64 {
            keypair_bytes
        } else {
            serde_json::from_slice::<Vec<u8>>(&keypair_bytes)
                .context("Failed to parse keypair JSON")?
        };
        Ok(Self::from_keypair(keypair_from_secret(&secret)?))
    }

    /// Create a new wallet manager from a base58 encoded 64-byte secret
    pub fn from_base58(secret: &str) -> Result<Self> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .context("Private key is not valid base58")?;
        Ok(Self::from_keypair(keypair_from_secret(&bytes)?))
    }

    /// Create a new wallet manager from a keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Get the public key
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Get a reference to the keypair
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Sign an unsigned swap transaction with the wallet key
    ///
    /// The wallet must be the message's only required signer.
    pub fn sign(&self, tx: &VersionedTransaction) -> Result<VersionedTransaction, SignerError> {
        VersionedTransaction::try_new(tx.message.clone(), &[self.keypair.as_ref()])
    }

    /// Log address and SOL balance; a failed lookup is only a warning
    pub async fn log_balance(&self, rpc: &dyn ChainRpc) {
        match rpc.balance(&self.pubkey()).await {
            Ok(lamports) => tracing::info!(
                wallet = %self.pubkey(),
                balance_sol = lamports_to_sol(lamports),
                "Wallet loaded"
            ),
            Err(e) => tracing::warn!(wallet = %self.pubkey(), error = %e, "Failed to fetch wallet balance"),
        }
    }
}

fn keypair_from_secret(bytes: &[u8]) -> Result<Keypair> {
    if bytes.len() != 64 {
        anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
    }
    if bytes.iter().all(|&b| b == 0) {
        anyhow::bail!("Invalid keypair: all-zero key rejected");
    }
    Keypair::try_from(bytes).context("Invalid keypair bytes")
}
