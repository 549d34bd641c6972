// SPDX-License-Identifier: Apache-2.0

//! Wallet and secret-store collaborator traits.
//!
//! The outer transaction signature (the wallet's) is distinct from the
//! chip's inner message signature; this seam keeps key custody entirely
//! outside the SDK.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("signing rejected: {0}")]
    Rejected(String),

    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// Signs prepared transaction envelopes on behalf of the user account.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The account address the wallet signs for
    fn address(&self) -> &str;

    /// Sign a prepared transaction envelope
    async fn sign(&self, transaction: &[u8]) -> Result<Vec<u8>, WalletError>;
}

#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

/// Secure key-value store for a locally held wallet secret.
pub trait SecretStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, SecretStoreError>;
    fn store(&self, secret: &str) -> Result<(), SecretStoreError>;
}

/// Process-lifetime store, for tests and custody-less setups.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secret: std::sync::Mutex<Option<String>>,
}

impl SecretStore for InMemorySecretStore {
    fn load(&self) -> Result<Option<String>, SecretStoreError> {
        Ok(self.secret.lock().expect("secret store poisoned").clone())
    }

    fn store(&self, secret: &str) -> Result<(), SecretStoreError> {
        *self.secret.lock().expect("secret store poisoned") = Some(secret.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_roundtrip() {
        let store = InMemorySecretStore::default();
        assert_eq!(store.load().unwrap(), None);
        store.store("S...SECRET").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("S...SECRET"));
    }
}
