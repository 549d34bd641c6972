// SPDX-License-Identifier: Apache-2.0

//! Chip-to-contract authorization pipeline
//!
//! Everything between a chip signature and an accepted contract call lives
//! here: the canonical message the contract rebuilds and hashes itself,
//! replay-nonce management, the contract-address codec, tag-URL parsing,
//! the collaborator seams (RPC, wallet, secret store) and the session
//! orchestrator that drives one attempt end to end.

pub mod errors;
pub mod message;
pub mod nonce;
pub mod orchestrator;
pub mod rpc;
pub mod scan;
pub mod strkey;
pub mod wallet;

pub use errors::AuthError;
pub use message::CanonicalMessage;
pub use orchestrator::{
    cancellation, CancelHandle, CancelSignal, Operation, OperationOutcome, Orchestrator,
    SessionConfig, SessionStep, StepUpdate,
};
pub use rpc::{
    balance, owner_of, ContractCall, PreparedTransaction, RpcClient, RpcError, TxStatus,
};
pub use scan::{parse_scanned_url, ScannedItem};
pub use wallet::{InMemorySecretStore, SecretStore, SecretStoreError, WalletError, WalletSigner};
