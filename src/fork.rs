//! Fork-state loading over JSON-RPC.
//!
//! The only async boundary in the crate. Pulls the target's bytecode and
//! balance (plus the chain's gas price) from an RPC endpoint and seeds the
//! in-memory harness; after seeding, probing is fully offline and
//! synchronous. Retries with exponential backoff, then falls back to a
//! public endpoint.

use alloy_primitives::{Address, Bytes, U256};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::PUBLIC_RPC_FALLBACK;
use crate::errors::{ProbeError, ProbeResult};
use crate::evm::EvmHarness;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_RETRIES: u32 = 3;
const BASE_RETRY_DELAY_MS: u64 = 100;

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// JSON-RPC client used to seed the simulation.
pub struct ForkLoader {
    url: String,
    client: reqwest::Client,
}

impl ForkLoader {
    pub fn new(url: impl Into<String>) -> ProbeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProbeError::fork_load_failed(format!("http client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> ProbeResult<String> {
        match self.call_with_retry(&self.url, method, &params).await {
            Ok(result) => return Ok(result),
            Err(e) => warn!("primary endpoint failed: {}", e),
        }

        if self.url != PUBLIC_RPC_FALLBACK {
            info!("retrying against public fallback endpoint");
            return self
                .call_with_retry(PUBLIC_RPC_FALLBACK, method, &params)
                .await;
        }

        Err(ProbeError::fork_load_failed(format!(
            "all endpoints failed for {}",
            method
        )))
    }

    async fn call_with_retry(
        &self,
        url: &str,
        method: &str,
        params: &serde_json::Value,
    ) -> ProbeResult<String> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let mut last_error = None;
        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_RETRY_DELAY_MS * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            match self.execute(url, &payload).await {
                Ok(result) => return Ok(result),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| ProbeError::fork_load_failed("no attempts executed".to_string())))
    }

    async fn execute(&self, url: &str, payload: &serde_json::Value) -> ProbeResult<String> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ProbeError::fork_load_failed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::fork_load_failed(format!("HTTP {}", status)));
        }

        let body: RpcResponse<String> = response
            .json()
            .await
            .map_err(|e| ProbeError::fork_load_failed(format!("bad response body: {}", e)))?;

        if let Some(err) = body.error {
            return Err(ProbeError::fork_load_failed(format!(
                "RPC error {}: {}",
                err.code, err.message
            )));
        }
        body.result
            .ok_or_else(|| ProbeError::fork_load_failed("empty result".to_string()))
    }

    pub async fn get_code(&self, address: Address) -> ProbeResult<Bytes> {
        let hex_str = self
            .call("eth_getCode", serde_json::json!([address.to_string(), "latest"]))
            .await?;
        decode_hex_bytes(&hex_str)
    }

    pub async fn get_balance(&self, address: Address) -> ProbeResult<U256> {
        let hex_str = self
            .call(
                "eth_getBalance",
                serde_json::json!([address.to_string(), "latest"]),
            )
            .await?;
        decode_hex_quantity(&hex_str)
    }

    pub async fn gas_price(&self) -> ProbeResult<U256> {
        let hex_str = self.call("eth_gasPrice", serde_json::json!([])).await?;
        decode_hex_quantity(&hex_str)
    }

    /// Pull the target's on-chain state into the harness. A target with no
    /// bytecode is rejected up front.
    pub async fn seed(&self, harness: &mut EvmHarness, target: Address) -> ProbeResult<()> {
        let code = self.get_code(target).await?;
        if code.is_empty() {
            return Err(ProbeError::fork_load_failed(format!(
                "{} has no bytecode on the forked chain",
                target
            )));
        }
        let balance = self.get_balance(target).await?;
        harness.insert_contract(target, code, balance);

        // Observed for the record only; probe transactions run gas-free and
        // the fee-refund scenario sets its own price.
        if let Ok(price) = self.gas_price().await {
            info!(chain_gas_price = %price, "chain gas price observed");
        }

        info!(target = %target, balance = %balance, "fork state seeded");
        Ok(())
    }
}

fn decode_hex_bytes(s: &str) -> ProbeResult<Bytes> {
    let stripped = s.trim_start_matches("0x");
    let raw = hex::decode(stripped)
        .map_err(|e| ProbeError::fork_load_failed(format!("bad hex payload: {}", e)))?;
    Ok(Bytes::from(raw))
}

fn decode_hex_quantity(s: &str) -> ProbeResult<U256> {
    let stripped = s.trim_start_matches("0x");
    if stripped.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(stripped, 16)
        .map_err(|e| ProbeError::fork_load_failed(format!("bad hex quantity: {}", e)))
}
