// SPDX-License-Identifier: Apache-2.0

//! Signing-applet client for secure-element tags
//!
//! This crate drives the tag's signing applet: reading the chip public key,
//! producing ECDSA signatures over caller-supplied digests, and reading or
//! writing the asset-locator URI stored in the tag's NDEF file. It also
//! carries the byte-exact signature plumbing the on-chain verifier depends
//! on: DER parsing, low-S normalization and recovery-id resolution.
//!
//! ## Features
//!
//! - **Key readout**: GET KEY INFO with signature counters
//! - **Signing**: GENERATE SIGNATURE over a 32-byte digest
//! - **Tag records**: NDEF URI read/write through the Type 4 file layout
//! - **Signature pipeline**: DER → components → low-S → recovery id
//! - **Async/Await**: fully async API over any [`Exchange`] transport

use async_trait::async_trait;
use tapchip_chip_base::App;
use tapchip_transport::Exchange;

pub mod commands;
pub mod der;
pub mod errors;
pub mod instructions;
pub mod ndef;
pub mod normalize;
pub mod recover;
pub mod types;
pub mod utils;

pub use commands::*;
pub use errors::*;
pub use types::*;

/// Signing-applet marker implementing the `App` trait CLA and AID.
#[derive(Debug, Clone)]
pub struct AuthChip;

impl App for AuthChip {
    /// Inter-industry CLA; the applet uses no proprietary class byte
    const CLA: u8 = 0x00;
    const AID: &'static [u8] = instructions::aid::AUTH_APPLET;
}

/// High-level client for one tag session.
///
/// Wraps the transport and exposes type-safe methods for every applet
/// operation. The transport is owned: one client, one exclusive session.
#[derive(Debug)]
pub struct AuthChipApp<E: Exchange> {
    transport: E,
}

impl<E: Exchange> AuthChipApp<E> {
    /// Create a new signing-applet client
    pub fn new(transport: E) -> Self {
        Self { transport }
    }

    /// Get a reference to the underlying transport
    pub fn transport(&self) -> &E {
        &self.transport
    }
}

#[async_trait]
impl<E> GetKeyInfo<E> for AuthChipApp<E>
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    async fn get_key_info(transport: &E, key_index: u8) -> AuthAppResult<KeyInfo, E::Error> {
        AuthChip::get_key_info(transport, key_index).await
    }
}

#[async_trait]
impl<E> GenerateSignature<E> for AuthChipApp<E>
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    async fn generate_signature(
        transport: &E,
        key_index: u8,
        digest: &[u8],
    ) -> AuthAppResult<ChipSignature, E::Error> {
        AuthChip::generate_signature(transport, key_index, digest).await
    }
}

impl<E> AuthChipApp<E>
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    /// SELECT the signing applet. Must run once per session before key or
    /// signature commands.
    pub async fn select(&self) -> AuthAppResult<Vec<u8>, E::Error> {
        Ok(<AuthChip as tapchip_chip_base::AppExt<E>>::select(&self.transport).await?)
    }

    /// Read the public key and signature counters for a key slot
    pub async fn get_key_info(&self, key_index: u8) -> AuthAppResult<KeyInfo, E::Error> {
        AuthChip::get_key_info(&self.transport, key_index).await
    }

    /// Sign a 32-byte digest with the key in the given slot
    pub async fn generate_signature(
        &self,
        key_index: u8,
        digest: &[u8],
    ) -> AuthAppResult<ChipSignature, E::Error> {
        AuthChip::generate_signature(&self.transport, key_index, digest).await
    }

    /// Read the asset-locator URI from the tag's NDEF file
    pub async fn read_tag_uri(&self) -> AuthAppResult<String, E::Error> {
        NdefTag::read_uri(&self.transport).await
    }

    /// Write the asset-locator URI into the tag's NDEF file
    pub async fn write_tag_uri(&self, uri: &str) -> AuthAppResult<(), E::Error> {
        NdefTag::write_uri(&self.transport, uri).await
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Deref;
    use std::sync::Mutex;

    use tapchip_transport::{async_trait, ApduAnswer, ApduCommand};

    use super::*;

    /// Replays a canned answer per exchanged command, in order.
    struct ScriptedTransport {
        answers: Mutex<Vec<Vec<u8>>>,
    }

    impl ScriptedTransport {
        fn replying(answers: Vec<Vec<u8>>) -> Self {
            Self {
                answers: Mutex::new(answers),
            }
        }
    }

    #[async_trait]
    impl Exchange for ScriptedTransport {
        type Error = std::io::Error;
        type AnswerType = Vec<u8>;

        async fn exchange<I>(
            &self,
            _command: &ApduCommand<I>,
        ) -> Result<ApduAnswer<Vec<u8>>, Self::Error>
        where
            I: Deref<Target = [u8]> + Send + Sync,
        {
            let mut answers = self.answers.lock().unwrap();
            let answer = answers.remove(0);
            Ok(ApduAnswer::from_answer(answer).expect("scripted answer too short"))
        }
    }

    #[tokio::test]
    async fn key_info_status_6a82_is_a_chip_error_not_a_key() {
        let transport = ScriptedTransport::replying(vec![vec![0x6A, 0x82]]);
        let app = AuthChipApp::new(transport);

        let err = app.get_key_info(0).await.unwrap_err();
        assert_eq!(err.status_word(), Some(0x6A82));
        assert!(err.to_string().contains("0x6a82"));
    }

    #[tokio::test]
    async fn signature_command_rejects_wrong_digest_length() {
        let transport = ScriptedTransport::replying(vec![]);
        let app = AuthChipApp::new(transport);

        let err = app.generate_signature(0, &[0u8; 31]).await.unwrap_err();
        assert!(matches!(
            err,
            AuthAppError::InvalidDigestLength { got: 31, .. }
        ));
    }

    #[tokio::test]
    async fn reads_tag_uri_through_ndef_file() {
        let mut record = ndef::encode_uri_record("https://merch.example/item");
        let nlen = (record.len() as u16).to_be_bytes();
        record.extend([0x90, 0x00]);

        let transport = ScriptedTransport::replying(vec![
            vec![0x90, 0x00],               // SELECT applet
            vec![0x90, 0x00],               // SELECT file
            vec![nlen[0], nlen[1], 0x90, 0x00], // NLEN read
            record,                         // record read
        ]);
        let app = AuthChipApp::new(transport);

        assert_eq!(app.read_tag_uri().await.unwrap(), "https://merch.example/item");
    }
}
