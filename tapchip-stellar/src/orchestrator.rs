// SPDX-License-Identifier: Apache-2.0

//! Chip session orchestration.
//!
//! One [`Orchestrator::run`] call drives a complete attempt:
//! Connecting → TagConnected → Reading → AwaitingNonce → Signing →
//! Recovering → CallingContract → Submitting → Confirming →
//! Succeeded/Failed. Transitions are linear; Failed is reachable from every
//! state. The chip connection is exclusive: a second attempt while one is
//! in flight is rejected, not queued.
//!
//! Exactly-once completion is structural. The blocking connect runs on a
//! `spawn_blocking` handle (a fill-once slot by ownership), and every
//! suspending step races a cancellation watch inside `select!`, which
//! drops the losing branch. No nullable callback fields, no double fire.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde_json::{json, Value};
use tapchip_auth_app::{
    normalize, recover, AuthChipApp, ChipPublicKey, NdefTag, SignatureComponents, TagRecords,
};
use tapchip_transport::Exchange;
use tokio::sync::watch;
use tokio::task;
use tokio::time;

use crate::errors::AuthError;
use crate::message::CanonicalMessage;
use crate::nonce::{self, MINT_NONCE};
use crate::rpc::{self, ContractCall, RpcClient, RpcError, TxStatus};
use crate::strkey;
use crate::wallet::WalletSigner;

/// What the caller asked the chip to authorize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Register the chip key as a new token
    Mint,
    /// Claim the token bound to this chip for an account
    Claim { claimant: String },
    /// Move a claimed token between accounts
    Transfer {
        from: String,
        to: String,
        token_id: u64,
    },
    /// Any other contract function authorized by a chip signature
    Invoke { function: String, args: Vec<Value> },
}

impl Operation {
    pub fn function_name(&self) -> &str {
        match self {
            Operation::Mint => "mint",
            Operation::Claim { .. } => "claim",
            Operation::Transfer { .. } => "transfer",
            Operation::Invoke { function, .. } => function,
        }
    }

    /// The arguments that go into the signed message, in contract order.
    pub fn business_args(&self) -> Vec<Value> {
        match self {
            Operation::Mint => Vec::new(),
            Operation::Claim { claimant } => vec![json!(claimant)],
            Operation::Transfer {
                from,
                to,
                token_id,
            } => vec![json!(from), json!(to), json!(token_id)],
            Operation::Invoke { args, .. } => args.clone(),
        }
    }

    fn is_mint(&self) -> bool {
        matches!(self, Operation::Mint)
    }

    /// Mint and claim return a token id; everything else just a hash.
    fn yields_token_id(&self) -> bool {
        matches!(self, Operation::Mint | Operation::Claim { .. })
    }
}

/// Orchestrator states, in transition order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStep {
    Idle,
    Connecting,
    TagConnected,
    Reading,
    AwaitingNonce,
    Signing,
    Recovering,
    CallingContract,
    Submitting,
    Confirming,
    Succeeded,
    Failed,
}

/// One progress notification, fired at each transition.
#[derive(Clone, Debug)]
pub struct StepUpdate {
    pub step: SessionStep,
    pub message: String,
}

type ProgressSink = dyn Fn(&StepUpdate) + Send + Sync;

/// Session parameters. Timeouts and polling bounds have defaults matched
/// to contactless readers and ledger close times.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub network_passphrase: String,
    /// 56-character contract address
    pub contract_id: String,
    /// Chip key slot to read and sign with
    pub key_index: u8,
    /// Bounded wait for a tag to enter the field
    pub connect_timeout: Duration,
    /// Confirmation polling cadence
    pub poll_interval: Duration,
    /// Confirmation polling ceiling
    pub poll_attempts: u32,
    /// When set, a successful mint writes `{base}/{contract}/{token}` back
    /// onto the tag
    pub write_back_base: Option<String>,
}

impl SessionConfig {
    pub fn new(network_passphrase: impl Into<String>, contract_id: impl Into<String>) -> Self {
        Self {
            network_passphrase: network_passphrase.into(),
            contract_id: contract_id.into(),
            key_index: 0,
            connect_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(2),
            poll_attempts: 15,
            write_back_base: None,
        }
    }
}

/// Terminal success value of one attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    TokenId(u64),
    TransactionHash(String),
}

/// Fires the cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// The receiving side passed into [`Orchestrator::run_cancellable`].
#[derive(Debug)]
pub struct CancelSignal(watch::Receiver<bool>);

/// Create a linked cancel handle/signal pair.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

/// Resolves only on explicit cancellation. A dropped handle never cancels.
async fn cancelled(signal: &mut CancelSignal) {
    if signal.0.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Race a step against cancellation. The losing future is dropped, so a
/// late completion can never fire after the attempt was torn down.
async fn step<T>(
    signal: &mut CancelSignal,
    fut: impl Future<Output = T>,
) -> Result<T, AuthError> {
    tokio::select! {
        biased;
        _ = cancelled(signal) => Err(AuthError::Cancelled),
        value = fut => Ok(value),
    }
}

pub struct Orchestrator {
    rpc: Arc<dyn RpcClient>,
    wallet: Arc<dyn WalletSigner>,
    config: SessionConfig,
    progress: Option<Box<ProgressSink>>,
    in_flight: AtomicBool,
}

/// Clears the exclusive-session flag when the attempt ends, however it ends.
struct SessionGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Orchestrator {
    pub fn new(
        rpc: Arc<dyn RpcClient>,
        wallet: Arc<dyn WalletSigner>,
        config: SessionConfig,
    ) -> Self {
        Self {
            rpc,
            wallet,
            config,
            progress: None,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Register a progress callback fired at each state transition.
    pub fn with_progress(mut self, sink: impl Fn(&StepUpdate) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// Run one attempt without external cancellation.
    pub async fn run<E, C>(
        &self,
        operation: Operation,
        connect: C,
    ) -> Result<OperationOutcome, AuthError>
    where
        E: Exchange + Send + Sync + 'static,
        E::Error: std::error::Error + Send + Sync + 'static,
        C: FnOnce() -> Result<E, AuthError> + Send + 'static,
    {
        let (_handle, signal) = cancellation();
        self.run_cancellable(operation, connect, signal).await
    }

    /// Run one attempt. `connect` performs the blocking tag connection and
    /// is subject to the configured bounded wait; `signal` aborts the
    /// attempt at the next suspension point with a cancellation marker
    /// distinct from hardware errors.
    pub async fn run_cancellable<E, C>(
        &self,
        operation: Operation,
        connect: C,
        mut signal: CancelSignal,
    ) -> Result<OperationOutcome, AuthError>
    where
        E: Exchange + Send + Sync + 'static,
        E::Error: std::error::Error + Send + Sync + 'static,
        C: FnOnce() -> Result<E, AuthError> + Send + 'static,
    {
        let _guard = self.acquire_session()?;

        let result = self.drive(&operation, connect, &mut signal).await;
        match &result {
            Ok(outcome) => self.emit(SessionStep::Succeeded, &format!("{outcome:?}")),
            Err(err) => self.emit(SessionStep::Failed, err.category()),
        }
        result
    }

    fn acquire_session(&self) -> Result<SessionGuard<'_>, AuthError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| AuthError::SessionBusy)?;
        Ok(SessionGuard {
            flag: &self.in_flight,
        })
    }

    fn emit(&self, step: SessionStep, message: &str) {
        info!("{step:?}: {message}");
        if let Some(sink) = &self.progress {
            sink(&StepUpdate {
                step,
                message: message.to_string(),
            });
        }
    }

    async fn drive<E, C>(
        &self,
        operation: &Operation,
        connect: C,
        signal: &mut CancelSignal,
    ) -> Result<OperationOutcome, AuthError>
    where
        E: Exchange + Send + Sync + 'static,
        E::Error: std::error::Error + Send + Sync + 'static,
        C: FnOnce() -> Result<E, AuthError> + Send + 'static,
    {
        let contract_raw = strkey::decode_contract_id(&self.config.contract_id)?;

        self.emit(SessionStep::Connecting, "waiting for tag");
        let connect_wait = time::timeout(self.config.connect_timeout, task::spawn_blocking(connect));
        let transport = match step(signal, connect_wait).await? {
            Err(_elapsed) => return Err(AuthError::ConnectTimeout),
            Ok(Err(join)) => return Err(AuthError::ChipTransport(Box::new(join))),
            Ok(Ok(Err(err))) => return Err(err),
            Ok(Ok(Ok(transport))) => transport,
        };
        let chip = AuthChipApp::new(transport);
        self.emit(SessionStep::TagConnected, "tag in field");

        self.emit(SessionStep::Reading, "reading chip public key");
        step(signal, chip.select())
            .await?
            .map_err(AuthError::from_chip)?;
        let key_info = step(signal, chip.get_key_info(self.config.key_index))
            .await?
            .map_err(AuthError::from_chip)?;
        let public_key = key_info.public_key;

        self.emit(SessionStep::AwaitingNonce, "deriving replay nonce");
        let nonce_value = if operation.is_mint() {
            MINT_NONCE
        } else {
            step(
                signal,
                nonce::next_nonce(self.rpc.as_ref(), &self.config.contract_id, &public_key),
            )
            .await??
        };

        // a transfer from the wrong account fails on chain anyway; checking
        // here spares the user a wasted chip signature
        if let Operation::Transfer { from, token_id, .. } = operation {
            let owner = step(
                signal,
                rpc::owner_of(self.rpc.as_ref(), &self.config.contract_id, *token_id),
            )
            .await??;
            if owner.as_deref() != Some(from.as_str()) {
                return Err(AuthError::TransactionRejected {
                    reason: format!("token {token_id} is not owned by {from}"),
                });
            }
        }

        let canonical = CanonicalMessage::build(
            &self.config.network_passphrase,
            &contract_raw,
            operation.function_name(),
            &operation.business_args(),
            nonce_value,
        );

        self.emit(SessionStep::Signing, "requesting chip signature");
        let chip_signature = step(
            signal,
            chip.generate_signature(self.config.key_index, canonical.hash()),
        )
        .await?
        .map_err(AuthError::from_chip)?;
        let (components, flipped) = normalize::normalize(chip_signature.components);
        if flipped {
            info!("normalized high-s signature from chip");
        }

        self.emit(SessionStep::Recovering, "resolving recovery id");
        let recovery_id = recover::resolve_recovery_id(canonical.hash(), &components, &public_key)
            .map_err(|err| match err {
                recover::RecoverError::NoMatch => AuthError::SignatureMismatch,
                recover::RecoverError::InvalidComponents => AuthError::SignatureFormat {
                    detail: err.to_string(),
                },
            })?;

        self.emit(SessionStep::CallingContract, "simulating contract call");
        let call = self.contract_call(operation, &canonical, &components, recovery_id, &public_key);
        let prepared = step(signal, self.rpc.simulate(&call)).await??;
        let signed = step(signal, self.wallet.sign(&prepared.transaction))
            .await?
            .map_err(|err| AuthError::TransactionRejected {
                reason: err.to_string(),
            })?;

        self.emit(SessionStep::Submitting, "submitting transaction");
        let hash = step(signal, self.rpc.submit(&signed)).await??;

        self.emit(SessionStep::Confirming, "waiting for confirmation");
        let result = self.poll_confirmation(signal, &hash).await?;

        let outcome = if operation.yields_token_id() {
            match result.as_u64() {
                Some(token_id) => OperationOutcome::TokenId(token_id),
                None => OperationOutcome::TransactionHash(hash),
            }
        } else {
            OperationOutcome::TransactionHash(hash)
        };

        if operation.is_mint() {
            if let (Some(base), OperationOutcome::TokenId(token_id)) =
                (&self.config.write_back_base, &outcome)
            {
                let locator = format!("{base}/{}/{token_id}", self.config.contract_id);
                // the token already exists on chain; neither a failed nor a
                // cancelled write-back may turn this attempt into a failure
                match step(signal, NdefTag::write_uri(chip.transport(), &locator)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => warn!("tag write-back failed: {err}"),
                    Err(_) => warn!("tag write-back skipped: cancelled"),
                }
            }
        }

        Ok(outcome)
    }

    /// Assemble the full invocation: business arguments first, then the
    /// proof block (message, signature, recovery id, public key, nonce).
    fn contract_call(
        &self,
        operation: &Operation,
        canonical: &CanonicalMessage,
        components: &SignatureComponents,
        recovery_id: u8,
        public_key: &ChipPublicKey,
    ) -> ContractCall {
        let mut args = operation.business_args();
        args.push(json!(hex::encode(canonical.message())));
        args.push(json!(components.to_hex()));
        args.push(json!(recovery_id));
        args.push(json!(public_key.to_hex()));
        args.push(json!(canonical.nonce()));

        ContractCall {
            contract_id: self.config.contract_id.clone(),
            function: operation.function_name().to_string(),
            args,
        }
    }

    /// Bounded confirmation polling: fixed interval, fixed attempt ceiling.
    /// Exhaustion is a timeout distinct from rejection, because the
    /// transaction may still land and a blind retry risks nonce reuse.
    async fn poll_confirmation(
        &self,
        signal: &mut CancelSignal,
        hash: &str,
    ) -> Result<Value, AuthError> {
        for attempt in 0..self.config.poll_attempts {
            if attempt > 0 {
                step(signal, time::sleep(self.config.poll_interval)).await?;
            }

            match step(signal, self.rpc.transaction_status(hash)).await? {
                Ok(TxStatus::Success { result }) => return Ok(result),
                Ok(TxStatus::Failed { reason }) => {
                    return Err(AuthError::TransactionRejected { reason })
                }
                Ok(TxStatus::Pending) | Ok(TxStatus::NotFound) => continue,
                // transient endpoint trouble counts against the ceiling
                Err(RpcError::Unreachable(detail)) => {
                    warn!("status poll failed: {detail}");
                    continue;
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(AuthError::TransactionTimeout {
            hash: hash.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_function_names() {
        assert_eq!(Operation::Mint.function_name(), "mint");
        assert_eq!(
            Operation::Claim {
                claimant: "G".into()
            }
            .function_name(),
            "claim"
        );
        assert_eq!(
            Operation::Invoke {
                function: "attest".into(),
                args: vec![]
            }
            .function_name(),
            "attest"
        );
    }

    #[test]
    fn transfer_args_are_ordered() {
        let op = Operation::Transfer {
            from: "GA".into(),
            to: "GB".into(),
            token_id: 9,
        };
        assert_eq!(op.business_args(), vec![json!("GA"), json!("GB"), json!(9)]);
    }

    #[test]
    fn only_mint_and_claim_yield_token_ids() {
        assert!(Operation::Mint.yields_token_id());
        assert!(Operation::Claim {
            claimant: "G".into()
        }
        .yields_token_id());
        assert!(!Operation::Invoke {
            function: "f".into(),
            args: vec![]
        }
        .yields_token_id());
    }
}
