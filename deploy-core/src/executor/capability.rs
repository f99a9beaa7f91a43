//! The deployment capability: the one place an artifact actually reaches a ledger.

use crate::error::Result;
use crate::registry::ConstructorArg;
use async_trait::async_trait;
use ring::digest;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("invalid address returned: {0}")]
    InvalidAddress(String),
}

impl CapabilityError {
    /// Whether the same call may succeed if simply repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, CapabilityError::Transport(_) | CapabilityError::Timeout(_))
    }
}

/// Deploys one artifact and returns its final address.
///
/// Implementations must only return once the address is confirmed.
#[async_trait]
pub trait DeployCapability: Send + Sync {
    async fn deploy(
        &self,
        artifact: &str,
        args: &[ConstructorArg],
    ) -> std::result::Result<String, CapabilityError>;
}

#[derive(Debug, Serialize)]
struct DeployRequest<'a> {
    artifact: &'a str,
    args: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DeployResponse {
    address: String,
}

/// Talks to an external deployer service that owns signing and chain access.
///
/// `POST {endpoint}/deploy` with `{"artifact", "args"}`, answered by `{"address"}`.
pub struct HttpCapability {
    client: reqwest::Client,
    url: String,
}

impl HttpCapability {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/deploy", endpoint.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn map_transport_error(err: reqwest::Error) -> CapabilityError {
    if err.is_timeout() {
        CapabilityError::Timeout(err.to_string())
    } else {
        CapabilityError::Transport(err.to_string())
    }
}

/// Only 503 means the deployer turned the request away before submitting anything.
/// Any other failure may follow a submitted transaction and must not be repeated.
fn classify_status(status: reqwest::StatusCode, body: &str) -> CapabilityError {
    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        CapabilityError::Transport(format!("deployer unavailable: {}", body))
    } else {
        CapabilityError::Rejected(format!("{}: {}", status, body))
    }
}

#[async_trait]
impl DeployCapability for HttpCapability {
    async fn deploy(
        &self,
        artifact: &str,
        args: &[ConstructorArg],
    ) -> std::result::Result<String, CapabilityError> {
        let request = DeployRequest {
            artifact,
            args: args.iter().map(ConstructorArg::to_wire).collect(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        // The deployment may already have happened, so a bad answer is never retried
        let body: DeployResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Rejected(format!("malformed deployer response: {}", e)))?;
        Ok(body.address)
    }
}

/// Local rehearsal capability: derives addresses from a SHA-256 digest instead of deploying.
#[derive(Debug, Default)]
pub struct SimulatedCapability {
    nonce: AtomicU64,
}

impl SimulatedCapability {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeployCapability for SimulatedCapability {
    async fn deploy(
        &self,
        artifact: &str,
        args: &[ConstructorArg],
    ) -> std::result::Result<String, CapabilityError> {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let encoded_args = serde_json::to_string(args)
            .map_err(|e| CapabilityError::Rejected(e.to_string()))?;

        let mut ctx = digest::Context::new(&digest::SHA256);
        ctx.update(artifact.as_bytes());
        ctx.update(encoded_args.as_bytes());
        ctx.update(&nonce.to_be_bytes());
        let hash = ctx.finish();

        let hex: String = hash.as_ref()[..20]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Ok(format!("0x{}", hex))
    }
}
