// SPDX-License-Identifier: Apache-2.0

//! Blockchain RPC collaborator traits.
//!
//! The SDK never talks to an RPC endpoint itself; callers supply an
//! implementation of [`RpcClient`]. The trait mirrors the four operations
//! the pipeline needs: simulation, submission, status polling and generic
//! read-only contract calls (nonce, ownership, balances).

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::errors::AuthError;

/// One contract invocation, with arguments as JSON values. Byte arguments
/// (message, signature, public key) travel hex-encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub contract_id: String,
    pub function: String,
    pub args: Vec<Value>,
}

/// Simulation output: the prepared transaction envelope to sign and submit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub transaction: Vec<u8>,
}

/// Terminal status of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Accepted but not yet in a ledger
    Pending,
    /// In a ledger; carries the invocation's return value
    Success { result: Value },
    /// In a ledger but failed
    Failed { reason: String },
    /// Unknown to the endpoint
    NotFound,
}

#[derive(Debug, Error)]
pub enum RpcError {
    /// Endpoint unreachable or answering garbage
    #[error("RPC unreachable: {0}")]
    Unreachable(String),

    /// Contract-level rejection during simulation or submission
    #[error("rejected: {reason}")]
    Rejected { reason: String },

    /// The contract rejected the nonce as already used
    #[error("stale nonce")]
    NonceConflict,
}

impl From<RpcError> for AuthError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Unreachable(detail) => AuthError::Network { detail },
            RpcError::Rejected { reason } => AuthError::TransactionRejected { reason },
            RpcError::NonceConflict => AuthError::NonceConflict,
        }
    }
}

/// A blockchain RPC endpoint as the pipeline sees it.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Simulate a contract call and return the prepared transaction
    async fn simulate(&self, call: &ContractCall) -> Result<PreparedTransaction, RpcError>;

    /// Submit a signed transaction; returns its hash
    async fn submit(&self, signed_transaction: &[u8]) -> Result<String, RpcError>;

    /// Current status of a submitted transaction
    async fn transaction_status(&self, hash: &str) -> Result<TxStatus, RpcError>;

    /// Read-only contract call with no state effects
    async fn invoke_read(&self, call: &ContractCall) -> Result<Value, RpcError>;
}

/// Current owner of a token, or `None` while it is unclaimed.
pub async fn owner_of(
    rpc: &dyn RpcClient,
    contract_id: &str,
    token_id: u64,
) -> Result<Option<String>, RpcError> {
    let call = ContractCall {
        contract_id: contract_id.to_string(),
        function: "owner_of".to_string(),
        args: vec![Value::from(token_id)],
    };
    let value = rpc.invoke_read(&call).await?;
    Ok(value.as_str().map(str::to_string))
}

/// Token balance of an account; absent storage reads as zero.
pub async fn balance(
    rpc: &dyn RpcClient,
    contract_id: &str,
    owner: &str,
) -> Result<u32, RpcError> {
    let call = ContractCall {
        contract_id: contract_id.to_string(),
        function: "balance".to_string(),
        args: vec![Value::from(owner)],
    };
    let value = rpc.invoke_read(&call).await?;
    Ok(value.as_u64().unwrap_or(0) as u32)
}
