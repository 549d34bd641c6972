// SPDX-License-Identifier: Apache-2.0

//! Canonical message construction.
//!
//! The verifying contract rebuilds and hashes these exact bytes itself;
//! any divergence breaks verification on-chain with no diagnostic beyond
//! "invalid signature". Field order is fixed:
//! `SHA-256(passphrase) ‖ contract id ‖ function name ‖ JSON args`.
//! The nonce is folded only into the hash, as its XDR form.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// XDR discriminant for a 32-bit unsigned value
const XDR_U32_DISCRIMINANT: u32 = 3;

/// The message a chip signs for one contract invocation, plus its hash.
///
/// `message` (without nonce bytes) is submitted as a contract argument;
/// the contract re-derives the hash using the explicitly passed nonce.
/// `hash` is what the chip signs. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalMessage {
    message: Vec<u8>,
    hash: [u8; 32],
    nonce: u32,
}

impl CanonicalMessage {
    /// Build the message and hash for one invocation attempt.
    pub fn build(
        network_passphrase: &str,
        contract_id: &[u8; 32],
        function_name: &str,
        args: &[Value],
        nonce: u32,
    ) -> Self {
        let network_hash = Sha256::digest(network_passphrase.as_bytes());

        let args_json = serde_json::to_vec(args).expect("JSON values always serialize");

        let mut message =
            Vec::with_capacity(32 + 32 + function_name.len() + args_json.len());
        message.extend_from_slice(&network_hash);
        message.extend_from_slice(contract_id);
        message.extend_from_slice(function_name.as_bytes());
        message.extend_from_slice(&args_json);

        let mut hasher = Sha256::new();
        hasher.update(&message);
        hasher.update(nonce_xdr(nonce));
        let hash = hasher.finalize().into();

        Self {
            message,
            hash,
            nonce,
        }
    }

    /// The bytes submitted as the contract's `message` argument.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// The 32-byte digest the chip signs.
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }
}

/// XDR encoding of a u32 value: 4-byte big-endian discriminant, then the
/// value as 4-byte big-endian.
fn nonce_xdr(nonce: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&XDR_U32_DISCRIMINANT.to_be_bytes());
    out[4..].copy_from_slice(&nonce.to_be_bytes());
    out
}
