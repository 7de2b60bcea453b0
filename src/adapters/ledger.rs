//! Optional on-ledger registration of a publication.
//!
//! One atomic transaction allocates a record account sized to the encoded
//! record and writes the record into it, signed by the caller's payer
//! keypair plus a freshly generated account keypair. Registration is
//! strictly informational: every failure is reported as a reason string,
//! never as an error, and never touches the publication result.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::core::error::DeployError;
use crate::domain::LedgerRegistration;

/// Fixed-schema record bound to a content id on the ledger.
///
/// Field order is the wire layout; the encoding must stay stable across
/// releases so existing accounts remain readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Content-derived bundle identifier
    pub content_id: String,

    /// Seconds since the Unix epoch
    pub timestamp: u64,

    /// Human-chosen label for this deployment
    pub label: String,

    /// Payer's public key
    pub owner: [u8; 32],
}

impl DeploymentRecord {
    /// Stable binary encoding used to size and fill the record account.
    pub fn encode(&self) -> Result<Vec<u8>> {
        postcard::to_stdvec(self).context("Failed to encode deployment record")
    }
}

/// Payer keypair, parsed from the credential file the caller supplied.
pub struct LedgerKeypair(SigningKey);

impl LedgerKeypair {
    /// Parse the conventional key file format: a JSON array of bytes,
    /// either a 64-byte keypair or a 32-byte seed.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, DeployError> {
        let invalid = |reason: String| DeployError::Credential {
            which: "ledger key",
            reason,
        };

        let bytes: Vec<u8> = serde_json::from_slice(raw)
            .map_err(|e| invalid(format!("not a JSON byte array: {}", e)))?;

        let signing_key = match bytes.len() {
            64 => {
                let keypair: [u8; 64] = bytes.try_into().expect("length checked");
                SigningKey::from_keypair_bytes(&keypair)
                    .map_err(|e| invalid(format!("invalid keypair bytes: {}", e)))?
            }
            32 => {
                let seed: [u8; 32] = bytes.try_into().expect("length checked");
                SigningKey::from_bytes(&seed)
            }
            n => return Err(invalid(format!("expected 32 or 64 bytes, got {}", n))),
        };

        Ok(Self(signing_key))
    }

    pub fn public_key(&self) -> [u8; 32] {
        let verifying_key: VerifyingKey = self.0.verifying_key();
        verifying_key.to_bytes()
    }
}

/// Transaction message: create the record account and write the record.
#[derive(Debug, Serialize)]
struct RegisterMessage<'a> {
    program_id: &'a str,
    payer: [u8; 32],
    account: [u8; 32],
    lamports: u64,
    space: u64,
    data: &'a [u8],
}

/// Signed wire form: message bytes plus payer and account signatures.
#[derive(Debug, Serialize)]
struct SignedTransaction {
    message: Vec<u8>,
    signatures: Vec<Vec<u8>>,
}

/// JSON-RPC envelope types.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

/// Submits registration transactions to a ledger RPC node.
pub struct LedgerRegistrar {
    rpc_url: String,
    program_id: String,
    client: reqwest::Client,
}

impl LedgerRegistrar {
    pub fn new(
        rpc_url: impl Into<String>,
        program_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            program_id: program_id.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client construction cannot fail with static options"),
        }
    }

    /// Register `content_id` under `label`, signed by `payer`.
    ///
    /// Infallible by contract: submission and confirmation errors come back
    /// as a failed `LedgerRegistration` with the reason populated.
    #[instrument(skip(self, payer))]
    pub async fn register(
        &self,
        content_id: &str,
        label: &str,
        payer: &LedgerKeypair,
    ) -> LedgerRegistration {
        match self.submit(content_id, label, payer).await {
            Ok(signature) => {
                info!(%signature, "deployment registered on ledger");
                LedgerRegistration::succeeded(signature)
            }
            Err(e) => {
                warn!(error = %e, "ledger registration failed");
                LedgerRegistration::failed(format!("{:#}", e))
            }
        }
    }

    async fn submit(&self, content_id: &str, label: &str, payer: &LedgerKeypair) -> Result<String> {
        let record = DeploymentRecord {
            content_id: content_id.to_string(),
            timestamp: chrono::Utc::now().timestamp() as u64,
            label: label.to_string(),
            owner: payer.public_key(),
        };
        let data = record.encode()?;

        // Storage cost for an account sized to the encoded record.
        let lamports = self
            .rpc_call(
                "getMinimumBalanceForRentExemption",
                serde_json::json!([data.len()]),
            )
            .await?
            .as_u64()
            .context("rent query returned a non-integer result")?;

        let account = SigningKey::generate(&mut OsRng);

        let message = RegisterMessage {
            program_id: &self.program_id,
            payer: payer.public_key(),
            account: account.verifying_key().to_bytes(),
            lamports,
            space: data.len() as u64,
            data: &data,
        };
        let message_bytes =
            postcard::to_stdvec(&message).context("Failed to encode transaction message")?;

        let payer_signature = payer.0.sign(&message_bytes).to_bytes();
        let account_signature = account.sign(&message_bytes).to_bytes();

        let transaction = SignedTransaction {
            message: message_bytes,
            signatures: vec![payer_signature.to_vec(), account_signature.to_vec()],
        };
        let wire = base64::engine::general_purpose::STANDARD
            .encode(postcard::to_stdvec(&transaction).context("Failed to encode transaction")?);

        let result = self
            .rpc_call("sendTransaction", serde_json::json!([wire]))
            .await?;

        // The node echoes the transaction signature; fall back to ours if it
        // returns anything else.
        let signature = result
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| base64::engine::general_purpose::STANDARD.encode(payer_signature));

        Ok(signature)
    }

    async fn rpc_call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await
            .with_context(|| format!("Failed to reach ledger RPC for '{}'", method))?;

        let body: RpcResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse ledger RPC response for '{}'", method))?;

        if let Some(error) = body.error {
            anyhow::bail!("Ledger RPC '{}' failed: {}", method, error.message);
        }

        body.result
            .with_context(|| format!("Ledger RPC '{}' returned no result", method))
    }
}
