//! Streaming data sources for real-time pool account monitoring
//!
//! A [`NotificationSource`] provides the two halves of a subscription
//! session: the live `programSubscribe` stream and the one-shot
//! `getProgramAccounts` reconciliation query. Both use the same
//! [`ListingFilters`].

#[cfg(feature = "ws-stream")]
pub mod websocket_stream;

use crate::sniffer::errors::SnifferError;
use async_trait::async_trait;
use solana_account_decoder::{UiAccountEncoding, UiDataSliceConfig};
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::mpsc;

#[cfg(feature = "ws-stream")]
pub use websocket_stream::{WebSocketSource, WebSocketStream};

/// One account-change notification as delivered by the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNotification {
    /// Address of the changed account (the dedup identity)
    pub account: Pubkey,
    /// Base64 account data, decoded by the handler
    pub payload: String,
    pub slot: u64,
}

/// Server-side filters that define a layout-compatible market account
#[derive(Debug, Clone)]
pub struct ListingFilters {
    pub program_id: Pubkey,
    pub data_size: u64,
    pub discriminator: [u8; 8],
    pub quote_mint: Pubkey,
    pub quote_mint_offset: usize,
    pub commitment: CommitmentConfig,
}

impl ListingFilters {
    /// dataSize + discriminator memcmp at 0 + quote mint memcmp
    pub fn rpc_filters(&self) -> Vec<RpcFilterType> {
        vec![
            RpcFilterType::DataSize(self.data_size),
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(0, &self.discriminator)),
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                self.quote_mint_offset,
                self.quote_mint.as_ref(),
            )),
        ]
    }

    /// Config for the live subscription (full base64 data)
    pub fn subscription_config(&self) -> RpcProgramAccountsConfig {
        RpcProgramAccountsConfig {
            filters: Some(self.rpc_filters()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                data_slice: None,
                min_context_slot: None,
            },
            with_context: Some(true),
            sort_results: None,
        }
    }

    /// Config for reconciliation; only addresses are needed so data is sliced away
    pub fn reconciliation_config(&self) -> RpcProgramAccountsConfig {
        RpcProgramAccountsConfig {
            filters: Some(self.rpc_filters()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                data_slice: Some(UiDataSliceConfig {
                    offset: 0,
                    length: 0,
                }),
                min_context_slot: None,
            },
            with_context: None,
            sort_results: None,
        }
    }
}

/// Transport behind the subscription client
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Open a new connection and send one subscribe request
    ///
    /// The returned receiver yields notifications until the connection
    /// closes, at which point it returns `None`.
    async fn subscribe(
        &self,
        filters: &ListingFilters,
    ) -> Result<mpsc::UnboundedReceiver<AccountNotification>, SnifferError>;

    /// Every currently-existing account matching `filters`
    async fn reconcile(&self, filters: &ListingFilters) -> Result<Vec<Pubkey>, SnifferError>;
}
