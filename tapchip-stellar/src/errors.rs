// SPDX-License-Identifier: Apache-2.0

//! Terminal error taxonomy for chip-to-contract operations

use thiserror::Error;

/// Every way an operation attempt can fail, as surfaced to the caller.
///
/// Parsing/format errors never auto-correct: they fail the step
/// immediately. Nonce and recovery failures are fatal to the attempt.
/// Network and timeout failures are retry-eligible, but a retry is always
/// a fresh attempt with a freshly re-read nonce.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Chip connection or I/O failure
    #[error("chip transport error: {0}")]
    ChipTransport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The bounded wait for a tag expired
    #[error("timed out waiting for a tag")]
    ConnectTimeout,

    /// The caller cancelled the attempt; distinct from hardware failures
    #[error("operation cancelled")]
    Cancelled,

    /// Another session already holds the chip connection
    #[error("a chip session is already open")]
    SessionBusy,

    /// Non-success status word or malformed chip response
    #[error("chip protocol error ({status:#06x}): {detail}")]
    ChipProtocol { status: u16, detail: String },

    /// Malformed DER signature from the chip
    #[error("signature format error: {detail}")]
    SignatureFormat { detail: String },

    /// No recovery id reproduces the chip public key
    #[error("signature does not match the chip public key")]
    SignatureMismatch,

    /// Bad base32 contract address or tag-resident identifier
    #[error("address format error: {detail}")]
    AddressFormat { detail: String },

    /// The contract rejected the nonce as stale
    #[error("contract rejected a stale nonce")]
    NonceConflict,

    /// RPC endpoint unreachable or failing
    #[error("network error: {detail}")]
    Network { detail: String },

    /// Simulation or submission failed, with the contract reason if known
    #[error("transaction rejected: {reason}")]
    TransactionRejected { reason: String },

    /// Confirmation polling exhausted; the transaction may still land
    #[error("transaction {hash} not confirmed in time")]
    TransactionTimeout { hash: String },
}

impl AuthError {
    /// Short user-facing category; the typed error stays in the logs.
    pub fn category(&self) -> &'static str {
        match self {
            AuthError::ChipTransport(_) | AuthError::ConnectTimeout => "chip-connection",
            AuthError::Cancelled => "cancelled",
            AuthError::SessionBusy => "busy",
            AuthError::ChipProtocol { .. } => "chip-protocol",
            AuthError::SignatureFormat { .. } | AuthError::SignatureMismatch => "signature",
            AuthError::AddressFormat { .. } => "address",
            AuthError::NonceConflict => "nonce",
            AuthError::Network { .. } => "network",
            AuthError::TransactionRejected { .. } => "rejected",
            AuthError::TransactionTimeout { .. } => "unconfirmed",
        }
    }

    /// Whether a fresh attempt (new chip read, new nonce) can help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::ConnectTimeout
                | AuthError::Network { .. }
                | AuthError::TransactionTimeout { .. }
        )
    }

    /// Fold a signing-applet error into the terminal taxonomy.
    pub fn from_chip<E>(err: tapchip_auth_app::AuthAppError<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        use tapchip_auth_app::AuthAppError;
        use tapchip_chip_base::ChipAppError;

        match err {
            AuthAppError::Chip(ChipAppError::Transport(source)) => {
                AuthError::ChipTransport(Box::new(source))
            }
            AuthAppError::Chip(chip) => AuthError::ChipProtocol {
                status: chip.status_word().unwrap_or(0),
                detail: chip.to_string(),
            },
            AuthAppError::SignatureFormat(der) => AuthError::SignatureFormat {
                detail: der.to_string(),
            },
            AuthAppError::SignatureMismatch => AuthError::SignatureMismatch,
            other => AuthError::ChipProtocol {
                status: 0,
                detail: other.to_string(),
            },
        }
    }
}
