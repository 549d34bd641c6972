// SPDX-License-Identifier: Apache-2.0

//! Error types for the signing-applet client

use tapchip_chip_base::ChipAppError;
use thiserror::Error;

use crate::der::DerError;
use crate::ndef::NdefError;

/// Signing-applet specific errors
#[derive(Debug, Error)]
pub enum AuthAppError<E: std::error::Error> {
    /// Error from the chip/transport layer (status word or I/O)
    #[error("chip error: {0}")]
    Chip(#[from] ChipAppError<E>),

    /// Malformed DER signature from the chip
    #[error("signature format error: {0}")]
    SignatureFormat(#[from] DerError),

    /// No candidate recovery id reproduces the chip's public key
    #[error("signature does not recover to the chip public key")]
    SignatureMismatch,

    /// Malformed tag record
    #[error("tag record error: {0}")]
    TagFormat(#[from] NdefError),

    /// Digest of the wrong length passed to signing
    #[error("digest must be exactly {expected} bytes, got {got}")]
    InvalidDigestLength { got: usize, expected: usize },

    /// Response data that does not match the fixed command layout
    #[error("invalid response data: {0}")]
    InvalidResponseData(String),
}

impl<E: std::error::Error> AuthAppError<E> {
    /// Wrap a raw transport error.
    pub fn from_transport(err: E) -> Self {
        AuthAppError::Chip(ChipAppError::Transport(err))
    }

    /// Raw status word, when the chip answered with a non-success word.
    pub fn status_word(&self) -> Option<u16> {
        match self {
            AuthAppError::Chip(inner) => inner.status_word(),
            _ => None,
        }
    }
}

/// Result type alias for signing-applet operations
pub type AuthAppResult<T, E> = Result<T, AuthAppError<E>>;
