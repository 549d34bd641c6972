// SPDX-License-Identifier: Apache-2.0

//! Replay-protection nonce management.
//!
//! The contract stores one monotonically increasing nonce per chip key and
//! rejects anything at or below it. Nothing is cached across attempts:
//! every attempt re-reads, because a failed submission leaves the on-chain
//! value unchanged.

use serde_json::{json, Value};
use tapchip_auth_app::ChipPublicKey;

use crate::errors::AuthError;
use crate::rpc::{ContractCall, RpcClient, RpcError};

/// Name of the contract's read-only nonce accessor
const GET_NONCE_FN: &str = "get_nonce";

/// Mint proves first possession, so it always signs nonce 1 regardless of
/// any stored value.
pub const MINT_NONCE: u32 = 1;

/// Fetch the stored nonce for a chip key and derive the next one to sign.
///
/// A void/absent on-chain value means the key was never used (0). An
/// outright RPC failure aborts the attempt instead of defaulting: signing
/// a guessed nonce would burn the user's tap on a guaranteed rejection.
pub async fn next_nonce(
    rpc: &dyn RpcClient,
    contract_id: &str,
    public_key: &ChipPublicKey,
) -> Result<u32, AuthError> {
    let call = ContractCall {
        contract_id: contract_id.to_string(),
        function: GET_NONCE_FN.to_string(),
        args: vec![json!(public_key.to_hex())],
    };

    let stored = match rpc.invoke_read(&call).await {
        Ok(Value::Null) => 0,
        Ok(value) => value.as_u64().ok_or_else(|| AuthError::Network {
            detail: format!("nonce query returned a non-numeric value: {value}"),
        })? as u32,
        Err(RpcError::Unreachable(detail)) => return Err(AuthError::Network { detail }),
        Err(other) => return Err(other.into()),
    };

    Ok(stored + 1)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::rpc::{PreparedTransaction, TxStatus};

    struct FixedNonceRpc(Result<Value, fn() -> RpcError>);

    #[async_trait]
    impl RpcClient for FixedNonceRpc {
        async fn simulate(&self, _: &ContractCall) -> Result<PreparedTransaction, RpcError> {
            unreachable!("nonce tests only read")
        }

        async fn submit(&self, _: &[u8]) -> Result<String, RpcError> {
            unreachable!("nonce tests only read")
        }

        async fn transaction_status(&self, _: &str) -> Result<TxStatus, RpcError> {
            unreachable!("nonce tests only read")
        }

        async fn invoke_read(&self, call: &ContractCall) -> Result<Value, RpcError> {
            assert_eq!(call.function, GET_NONCE_FN);
            self.0.clone().map_err(|make| make())
        }
    }

    fn chip_key() -> ChipPublicKey {
        ChipPublicKey::from_coordinates(&[0xAB; 64])
    }

    #[tokio::test]
    async fn stored_five_signs_six() {
        let rpc = FixedNonceRpc(Ok(json!(5)));
        let next = next_nonce(&rpc, "C_TEST", &chip_key()).await.unwrap();
        assert_eq!(next, 6);
    }

    #[tokio::test]
    async fn unused_key_signs_one() {
        let rpc = FixedNonceRpc(Ok(Value::Null));
        let next = next_nonce(&rpc, "C_TEST", &chip_key()).await.unwrap();
        assert_eq!(next, 1);
    }

    #[tokio::test]
    async fn network_failure_aborts_instead_of_defaulting() {
        let rpc = FixedNonceRpc(Err(|| RpcError::Unreachable("conn refused".into())));
        let err = next_nonce(&rpc, "C_TEST", &chip_key()).await.unwrap_err();
        assert!(matches!(err, AuthError::Network { .. }));
    }
}
