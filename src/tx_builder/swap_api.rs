//! Quote and swap-build collaborator
//!
//! The executor only needs two calls: get a quote for a route, and turn a
//! quote plus [`SwapParams`] into an unsigned transaction. [`JupiterSwapApi`]
//! speaks the Jupiter-compatible `/swap/v1` HTTP API.

use super::errors::SwapApiError;
use crate::metrics::{metrics, Timer};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use std::time::Duration;

/// Priority-fee level requested from the swap builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriorityLevel {
    Medium,
    High,
    VeryHigh,
}

/// Parameters for every swap build of one trade
///
/// Defaults: 3000 bps slippage, 900 000 lamports priority-fee ceiling at
/// `high`, dynamic compute-unit limit on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    pub user_public_key: Pubkey,
    pub slippage_bps: u16,
    pub max_priority_fee_lamports: u64,
    pub priority_level: PriorityLevel,
    pub dynamic_compute_unit_limit: bool,
}

impl SwapParams {
    pub fn new(user_public_key: Pubkey) -> Self {
        Self {
            user_public_key,
            slippage_bps: 3000,
            max_priority_fee_lamports: 900_000,
            priority_level: PriorityLevel::High,
            dynamic_compute_unit_limit: true,
        }
    }
}

/// Route to quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    /// Input amount in base units
    pub amount: u64,
    pub slippage_bps: u16,
}

/// Opaque quote, passed back verbatim when building
#[derive(Debug, Clone, PartialEq)]
pub struct Quote(pub Value);

impl Quote {
    /// Expected output amount, when the quote carries one
    pub fn out_amount(&self) -> Option<u64> {
        self.0.get("outAmount")?.as_str()?.parse().ok()
    }
}

#[async_trait]
pub trait SwapApi: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, SwapApiError>;

    /// Build an unsigned swap transaction for `quote`
    async fn build(
        &self,
        quote: &Quote,
        params: &SwapParams,
    ) -> Result<VersionedTransaction, SwapApiError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    quote_response: &'a Value,
    user_public_key: String,
    dynamic_compute_unit_limit: bool,
    slippage_bps: u16,
    prioritization_fee_lamports: PrioritizationFee,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrioritizationFee {
    priority_level_with_max_lamports: PriorityLevelWithMaxLamports,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriorityLevelWithMaxLamports {
    max_lamports: u64,
    priority_level: PriorityLevel,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
}

/// Jupiter-compatible swap API over HTTP
pub struct JupiterSwapApi {
    http: reqwest::Client,
    base_url: String,
}

impl JupiterSwapApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SwapApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SwapApiError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SwapApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SwapApiError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        response
            .json()
            .await
            .map_err(|e| SwapApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl SwapApi for JupiterSwapApi {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, SwapApiError> {
        let timer = Timer::new();
        let response = self
            .http
            .get(format!("{}/swap/v1/quote", self.base_url))
            .query(&[
                ("inputMint", request.input_mint.to_string()),
                ("outputMint", request.output_mint.to_string()),
                ("amount", request.amount.to_string()),
                ("slippageBps", request.slippage_bps.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SwapApiError::Request(e.to_string()))?;
        let quote: Value = Self::read_json(response).await?;
        timer.observe_duration(&metrics().http_latency);

        if quote.get("error").is_some() || !quote.is_object() {
            return Err(SwapApiError::InvalidResponse(quote.to_string()));
        }
        Ok(Quote(quote))
    }

    async fn build(
        &self,
        quote: &Quote,
        params: &SwapParams,
    ) -> Result<VersionedTransaction, SwapApiError> {
        let timer = Timer::new();
        let body = SwapRequest {
            quote_response: &quote.0,
            user_public_key: params.user_public_key.to_string(),
            dynamic_compute_unit_limit: params.dynamic_compute_unit_limit,
            slippage_bps: params.slippage_bps,
            prioritization_fee_lamports: PrioritizationFee {
                priority_level_with_max_lamports: PriorityLevelWithMaxLamports {
                    max_lamports: params.max_priority_fee_lamports,
                    priority_level: params.priority_level,
                },
            },
        };
        let response = self
            .http
            .post(format!("{}/swap/v1/swap", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SwapApiError::Request(e.to_string()))?;
        let swap: SwapResponse = Self::read_json(response).await?;
        timer.observe_duration(&metrics().http_latency);

        decode_transaction(&swap.swap_transaction)
    }
}

/// Characters of an error body kept in [`SwapApiError::Status`]
const MAX_ERROR_BODY_CHARS: usize = 512;

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Base64 bincode payload to a transaction
pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, SwapApiError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| SwapApiError::InvalidTransaction(e.to_string()))?;
    bincode::deserialize(&bytes).map_err(|e| SwapApiError::InvalidTransaction(e.to_string()))
}
