// SPDX-License-Identifier: Apache-2.0

//! End-to-end orchestrator flows against an in-process mock chip (a real
//! secp256k1 key behind the APDU layout) and a scripted RPC endpoint.

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use k256::ecdsa::SigningKey;
use rand_core::OsRng;
use serde_json::{json, Value};
use tapchip_auth_app::{der, ndef, recover, ChipPublicKey, SignatureComponents};
use tapchip_stellar::{
    cancellation, strkey, CanonicalMessage, ContractCall, Operation, OperationOutcome,
    Orchestrator, PreparedTransaction, RpcClient, RpcError, SessionConfig, TxStatus, WalletError,
    WalletSigner,
};
use tapchip_transport::{async_trait, ApduAnswer, ApduCommand, Exchange};

const PASSPHRASE: &str = "Test SDF Network ; September 2015";
const CLAIMANT: &str = "GDEMOACCOUNTAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// A tag with a real signing key behind the chip's wire layout.
struct MockChip {
    key: SigningKey,
    /// When set, GET KEY INFO answers with this status word instead
    key_info_status: Option<u16>,
    writes: Mutex<Vec<(u16, Vec<u8>)>>,
}

impl MockChip {
    fn new(key: SigningKey) -> Self {
        Self {
            key,
            key_info_status: None,
            writes: Mutex::new(Vec::new()),
        }
    }

    fn public_key(&self) -> ChipPublicKey {
        let point = self.key.verifying_key().to_encoded_point(false);
        ChipPublicKey::from_bytes(point.as_bytes().try_into().unwrap())
    }
}

#[async_trait]
impl Exchange for Arc<MockChip> {
    type Error = std::io::Error;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(&self, command: &ApduCommand<I>) -> Result<ApduAnswer<Vec<u8>>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        let mut answer = match command.ins {
            // SELECT: applet or file, always present
            0xA4 => Vec::new(),
            // GET KEY INFO
            0x16 => {
                if let Some(status) = self.key_info_status {
                    return Ok(ApduAnswer::from_answer(status.to_be_bytes().to_vec()).unwrap());
                }
                let mut payload = Vec::new();
                payload.extend(999_990u32.to_be_bytes());
                payload.extend(99_999u32.to_be_bytes());
                payload.extend_from_slice(self.public_key().as_bytes());
                payload
            }
            // GENERATE SIGNATURE over the 32-byte digest in the body
            0x18 => {
                let digest: [u8; 32] = command.data.deref().try_into().unwrap();
                let (signature, _) = self.key.sign_prehash_recoverable(&digest).unwrap();
                let (r_bytes, s_bytes) = signature.split_bytes();
                let r: [u8; 32] = r_bytes.into();
                let s: [u8; 32] = s_bytes.into();

                let mut payload = Vec::new();
                payload.extend(999_989u32.to_be_bytes());
                payload.extend(99_998u32.to_be_bytes());
                payload.extend(der::encode(&r, &s));
                payload
            }
            // UPDATE BINARY: record tag write-back
            0xD6 => {
                let offset = u16::from_be_bytes([command.p1, command.p2]);
                self.writes
                    .lock()
                    .unwrap()
                    .push((offset, command.data.deref().to_vec()));
                Vec::new()
            }
            other => panic!("mock chip got unexpected instruction {other:#04x}"),
        };

        answer.extend([0x90, 0x00]);
        Ok(ApduAnswer::from_answer(answer).unwrap())
    }
}

/// Scripted RPC endpoint recording every call it sees.
struct MockRpc {
    stored_nonce: Value,
    owner: Value,
    statuses: Mutex<VecDeque<TxStatus>>,
    reads: Mutex<Vec<ContractCall>>,
    simulations: Mutex<Vec<ContractCall>>,
}

impl MockRpc {
    fn new(stored_nonce: Value, statuses: Vec<TxStatus>) -> Self {
        Self {
            stored_nonce,
            owner: Value::Null,
            statuses: Mutex::new(statuses.into()),
            reads: Mutex::new(Vec::new()),
            simulations: Mutex::new(Vec::new()),
        }
    }

    fn with_owner(mut self, owner: Value) -> Self {
        self.owner = owner;
        self
    }
}

#[async_trait]
impl RpcClient for MockRpc {
    async fn simulate(&self, call: &ContractCall) -> Result<PreparedTransaction, RpcError> {
        self.simulations.lock().unwrap().push(call.clone());
        Ok(PreparedTransaction {
            transaction: b"prepared-envelope".to_vec(),
        })
    }

    async fn submit(&self, signed: &[u8]) -> Result<String, RpcError> {
        assert_eq!(signed, b"prepared-envelope/signed");
        Ok("txhash0001".to_string())
    }

    async fn transaction_status(&self, hash: &str) -> Result<TxStatus, RpcError> {
        assert_eq!(hash, "txhash0001");
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TxStatus::Pending))
    }

    async fn invoke_read(&self, call: &ContractCall) -> Result<Value, RpcError> {
        self.reads.lock().unwrap().push(call.clone());
        match call.function.as_str() {
            "get_nonce" => Ok(self.stored_nonce.clone()),
            "owner_of" => Ok(self.owner.clone()),
            other => panic!("mock RPC got unexpected read {other}"),
        }
    }
}

struct MockWallet;

#[async_trait]
impl WalletSigner for MockWallet {
    fn address(&self) -> &str {
        CLAIMANT
    }

    async fn sign(&self, transaction: &[u8]) -> Result<Vec<u8>, WalletError> {
        let mut signed = transaction.to_vec();
        signed.extend_from_slice(b"/signed");
        Ok(signed)
    }
}

fn contract_address() -> String {
    strkey::encode_contract_id(&[7u8; 32])
}

fn config() -> SessionConfig {
    let mut config = SessionConfig::new(PASSPHRASE, contract_address());
    config.poll_interval = Duration::from_millis(1);
    config
}

fn orchestrator(rpc: Arc<MockRpc>, config: SessionConfig) -> Orchestrator {
    Orchestrator::new(rpc, Arc::new(MockWallet), config)
}

#[tokio::test]
async fn claim_signs_next_nonce_and_reports_token_id() {
    let chip = Arc::new(MockChip::new(SigningKey::random(&mut OsRng)));
    let public_key = chip.public_key();
    let rpc = Arc::new(MockRpc::new(
        json!(5),
        vec![TxStatus::Pending, TxStatus::Success { result: json!(7) }],
    ));

    let orch = orchestrator(rpc.clone(), config());
    let outcome = orch
        .run(
            Operation::Claim {
                claimant: CLAIMANT.to_string(),
            },
            {
                let chip = chip.clone();
                move || Ok(chip)
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome, OperationOutcome::TokenId(7));

    // the nonce was read for this chip key, never cached
    let reads = rpc.reads.lock().unwrap();
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0].function, "get_nonce");
    assert_eq!(reads[0].args, vec![json!(public_key.to_hex())]);

    // stored nonce 5 → signed nonce 6, and the submitted message matches an
    // independently rebuilt canonical message bit for bit
    let simulations = rpc.simulations.lock().unwrap();
    assert_eq!(simulations.len(), 1);
    let call = &simulations[0];
    assert_eq!(call.function, "claim");
    assert_eq!(call.args[0], json!(CLAIMANT));
    assert_eq!(call.args[5], json!(6));

    let expected = CanonicalMessage::build(
        PASSPHRASE,
        &[7u8; 32],
        "claim",
        &[json!(CLAIMANT)],
        6,
    );
    assert_eq!(call.args[1], json!(hex::encode(expected.message())));

    // the proof block verifies: recovered key equals the chip key
    let signature_bytes = hex::decode(call.args[2].as_str().unwrap()).unwrap();
    let components = SignatureComponents {
        r: signature_bytes[..32].try_into().unwrap(),
        s: signature_bytes[32..].try_into().unwrap(),
    };
    let recovery_id = call.args[3].as_u64().unwrap() as u8;
    let recovered = recover::recover_candidate(expected.hash(), &components, recovery_id)
        .unwrap()
        .expect("recovery id must yield a point");
    assert_eq!(&recovered, public_key.as_bytes());
    assert_eq!(call.args[4], json!(public_key.to_hex()));
}

#[tokio::test]
async fn mint_always_signs_nonce_one_without_reading() {
    let chip = Arc::new(MockChip::new(SigningKey::random(&mut OsRng)));
    let rpc = Arc::new(MockRpc::new(
        json!(41),
        vec![TxStatus::Success { result: json!(0) }],
    ));

    let orch = orchestrator(rpc.clone(), config());
    let outcome = orch
        .run(Operation::Mint, {
            let chip = chip.clone();
            move || Ok(chip)
        })
        .await
        .unwrap();

    assert_eq!(outcome, OperationOutcome::TokenId(0));
    assert!(rpc.reads.lock().unwrap().is_empty());
    let simulations = rpc.simulations.lock().unwrap();
    assert_eq!(simulations[0].args.last().unwrap(), &json!(1));
}

#[tokio::test]
async fn mint_writes_locator_back_onto_the_tag() {
    let chip = Arc::new(MockChip::new(SigningKey::random(&mut OsRng)));
    let rpc = Arc::new(MockRpc::new(
        Value::Null,
        vec![TxStatus::Success { result: json!(3) }],
    ));

    let mut config = config();
    config.write_back_base = Some("https://merch.example".to_string());

    let orch = orchestrator(rpc, config);
    orch.run(Operation::Mint, {
        let chip = chip.clone();
        move || Ok(chip)
    })
    .await
    .unwrap();

    let writes = chip.writes.lock().unwrap();
    // zeroed NLEN, record body, then the real NLEN
    assert_eq!(writes[0], (0, vec![0x00, 0x00]));
    assert_eq!(writes[1].0, 2);
    let record = &writes[1].1;
    assert_eq!(writes[2], (0, (record.len() as u16).to_be_bytes().to_vec()));

    let locator = ndef::decode_uri_record(record).unwrap();
    assert_eq!(
        locator,
        format!("https://merch.example/{}/3", contract_address())
    );
}

#[tokio::test]
async fn transfer_checks_ownership_and_signs_next_nonce() {
    let chip = Arc::new(MockChip::new(SigningKey::random(&mut OsRng)));
    let rpc = Arc::new(
        MockRpc::new(
            json!(2),
            vec![TxStatus::Success { result: Value::Null }],
        )
        .with_owner(json!(CLAIMANT)),
    );

    let orch = orchestrator(rpc.clone(), config());
    let outcome = orch
        .run(
            Operation::Transfer {
                from: CLAIMANT.to_string(),
                to: "GRECIPIENT".to_string(),
                token_id: 9,
            },
            {
                let chip = chip.clone();
                move || Ok(chip)
            },
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        OperationOutcome::TransactionHash("txhash0001".to_string())
    );

    let reads = rpc.reads.lock().unwrap();
    assert_eq!(reads[0].function, "get_nonce");
    assert_eq!(reads[1].function, "owner_of");
    assert_eq!(reads[1].args, vec![json!(9)]);

    let simulations = rpc.simulations.lock().unwrap();
    assert_eq!(simulations[0].function, "transfer");
    assert_eq!(
        &simulations[0].args[..3],
        &[json!(CLAIMANT), json!("GRECIPIENT"), json!(9)]
    );
    assert_eq!(simulations[0].args.last().unwrap(), &json!(3));
}

#[tokio::test]
async fn transfer_from_wrong_account_is_rejected_before_signing() {
    let chip = Arc::new(MockChip::new(SigningKey::random(&mut OsRng)));
    let rpc = Arc::new(MockRpc::new(json!(2), vec![]).with_owner(json!("GSOMEBODYELSE")));

    let orch = orchestrator(rpc.clone(), config());
    let err = orch
        .run(
            Operation::Transfer {
                from: CLAIMANT.to_string(),
                to: "GRECIPIENT".to_string(),
                token_id: 9,
            },
            move || Ok(chip),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        tapchip_stellar::AuthError::TransactionRejected { .. }
    ));
    // the contract call never happened
    assert!(rpc.simulations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn key_info_failure_surfaces_the_status_word() {
    let mut mock = MockChip::new(SigningKey::random(&mut OsRng));
    mock.key_info_status = Some(0x6A82);
    let chip = Arc::new(mock);
    let rpc = Arc::new(MockRpc::new(Value::Null, vec![]));

    let orch = orchestrator(rpc, config());
    let err = orch
        .run(Operation::Mint, move || Ok(chip))
        .await
        .unwrap_err();

    match err {
        tapchip_stellar::AuthError::ChipProtocol { status, ref detail } => {
            assert_eq!(status, 0x6A82);
            assert!(detail.contains("0x6a82"), "detail was: {detail}");
        }
        other => panic!("expected chip protocol error, got {other:?}"),
    }
    assert_eq!(err.category(), "chip-protocol");
}

#[tokio::test]
async fn exhausted_polling_is_a_timeout_not_a_rejection() {
    let chip = Arc::new(MockChip::new(SigningKey::random(&mut OsRng)));
    let rpc = Arc::new(MockRpc::new(Value::Null, vec![]));

    let mut config = config();
    config.poll_attempts = 3;

    let orch = orchestrator(rpc, config);
    let err = orch
        .run(Operation::Mint, move || Ok(chip))
        .await
        .unwrap_err();

    match err {
        tapchip_stellar::AuthError::TransactionTimeout { ref hash } => {
            assert_eq!(hash, "txhash0001");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn contract_failure_is_a_rejection_with_reason() {
    let chip = Arc::new(MockChip::new(SigningKey::random(&mut OsRng)));
    let rpc = Arc::new(MockRpc::new(
        Value::Null,
        vec![TxStatus::Failed {
            reason: "already claimed".to_string(),
        }],
    ));

    let orch = orchestrator(rpc, config());
    let err = orch
        .run(Operation::Mint, move || Ok(chip))
        .await
        .unwrap_err();

    match err {
        tapchip_stellar::AuthError::TransactionRejected { ref reason } => {
            assert_eq!(reason, "already claimed");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn pre_fired_cancellation_never_touches_the_chip() {
    let rpc = Arc::new(MockRpc::new(Value::Null, vec![]));
    let orch = orchestrator(rpc, config());

    let (handle, signal) = cancellation();
    handle.cancel();

    let err = orch
        .run_cancellable(
            Operation::Mint,
            || Ok::<_, tapchip_stellar::AuthError>(Arc::new(MockChip::new(SigningKey::random(&mut OsRng)))),
            signal,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, tapchip_stellar::AuthError::Cancelled));
    assert_eq!(err.category(), "cancelled");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_session_is_rejected_while_one_is_open() {
    let chip = Arc::new(MockChip::new(SigningKey::random(&mut OsRng)));
    let rpc = Arc::new(MockRpc::new(
        Value::Null,
        vec![TxStatus::Success { result: json!(0) }],
    ));

    let orch = Arc::new(orchestrator(rpc, config()));

    let (started_tx, started_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

    let first = {
        let orch = orch.clone();
        let chip = chip.clone();
        tokio::spawn(async move {
            orch.run(Operation::Mint, move || {
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                Ok(chip)
            })
            .await
        })
    };

    // first attempt is inside its blocking connect and holds the session
    started_rx.recv().unwrap();

    let second_chip = Arc::new(MockChip::new(SigningKey::random(&mut OsRng)));
    let err = orch
        .run(Operation::Mint, move || Ok(second_chip))
        .await
        .unwrap_err();
    assert!(matches!(err, tapchip_stellar::AuthError::SessionBusy));

    release_tx.send(()).unwrap();
    first.await.unwrap().unwrap();
}
