//! WebSocket streaming implementation for real-time Solana data
//!
//! Uses the native `programSubscribe` WebSocket API for live notifications
//! and the HTTP RPC `getProgramAccounts` call for reconciliation.

use super::{AccountNotification, ListingFilters, NotificationSource};
use crate::sniffer::errors::SnifferError;
use async_trait::async_trait;
use futures_util::StreamExt;
use solana_account_decoder::{UiAccountData, UiAccountEncoding};
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::response::{Response, RpcKeyedAccount};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// WebSocket streaming client for monitoring Solana programs
pub struct WebSocketStream {
    ws_url: String,
}

impl WebSocketStream {
    /// Create new WebSocket stream
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    /// Connect to WebSocket endpoint and return client
    pub async fn connect(&self) -> Result<Arc<PubsubClient>, SnifferError> {
        info!(url = %self.ws_url, "Connecting to WebSocket");

        let client = PubsubClient::new(&self.ws_url)
            .await
            .map_err(|e| SnifferError::StreamConnection(e.to_string()))?;

        info!("WebSocket connected successfully");
        Ok(Arc::new(client))
    }

    /// Subscribe to filtered program account updates
    ///
    /// Resolves once the server acknowledged the subscription. Notifications
    /// are forwarded into `tx` by a task that owns `client`; the task ends
    /// when the socket closes or the receiver is dropped, which drops the
    /// client and with it the connection.
    pub async fn subscribe_program(
        &self,
        client: Arc<PubsubClient>,
        filters: &ListingFilters,
        tx: mpsc::UnboundedSender<AccountNotification>,
    ) -> Result<(), SnifferError> {
        info!(program = %filters.program_id, data_size = filters.data_size, "Subscribing to program");

        let program_id = filters.program_id;
        let config = filters.subscription_config();
        let (ack_tx, ack_rx) = oneshot::channel::<Result<(), String>>();

        tokio::spawn(async move {
            let (mut notifications, unsubscribe) =
                match client.program_subscribe(&program_id, Some(config)).await {
                    Ok(result) => {
                        let _ = ack_tx.send(Ok(()));
                        result
                    }
                    Err(e) => {
                        let _ = ack_tx.send(Err(e.to_string()));
                        return;
                    }
                };

            loop {
                tokio::select! {
                    next = notifications.next() => {
                        let Some(response) = next else {
                            debug!(program = %program_id, "Notification stream ended");
                            break;
                        };
                        match AccountNotification::from_response(response) {
                            Some(notification) => {
                                if tx.send(notification).is_err() {
                                    break;
                                }
                            }
                            None => warn!("Dropping notification with unexpected encoding"),
                        }
                    }
                    _ = tx.closed() => {
                        debug!("Receiver dropped, unsubscribing");
                        break;
                    }
                }
            }
            unsubscribe().await;
        });

        match ack_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SnifferError::Subscription(e)),
            Err(_) => Err(SnifferError::Subscription(
                "subscription task ended before acknowledgement".into(),
            )),
        }
    }
}

impl AccountNotification {
    /// Create from pubsub response; `None` for non-base64 account data
    pub fn from_response(response: Response<RpcKeyedAccount>) -> Option<Self> {
        let keyed_account = response.value;
        let account = Pubkey::from_str(&keyed_account.pubkey).ok()?;
        let payload = match keyed_account.account.data {
            UiAccountData::Binary(data, UiAccountEncoding::Base64) => data,
            _ => return None,
        };

        Some(Self {
            account,
            payload,
            slot: response.context.slot,
        })
    }
}

/// Production [`NotificationSource`]: WebSocket subscription plus HTTP reconciliation
pub struct WebSocketSource {
    stream: WebSocketStream,
    rpc: Arc<RpcClient>,
}

impl WebSocketSource {
    pub fn new(ws_url: String, rpc: Arc<RpcClient>) -> Self {
        Self {
            stream: WebSocketStream::new(ws_url),
            rpc,
        }
    }
}

#[async_trait]
impl NotificationSource for WebSocketSource {
    async fn subscribe(
        &self,
        filters: &ListingFilters,
    ) -> Result<mpsc::UnboundedReceiver<AccountNotification>, SnifferError> {
        let client = self.stream.connect().await?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.stream.subscribe_program(client, filters, tx).await?;
        Ok(rx)
    }

    async fn reconcile(&self, filters: &ListingFilters) -> Result<Vec<Pubkey>, SnifferError> {
        let accounts = self
            .rpc
            .get_program_accounts_with_config(&filters.program_id, filters.reconciliation_config())
            .await
            .map_err(|e| SnifferError::Reconciliation(e.to_string()))?;
        Ok(accounts.into_iter().map(|(pubkey, _)| pubkey).collect())
    }
}
