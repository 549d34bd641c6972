// SPDX-License-Identifier: Apache-2.0

//! GENERATE SIGNATURE command implementation

use async_trait::async_trait;
use tapchip_chip_base::{App, AppExt};
use tapchip_transport::{ApduCommand, Exchange};

use crate::der;
use crate::errors::{AuthAppError, AuthAppResult};
use crate::instructions::{ins, length};
use crate::types::ChipSignature;
use crate::utils::parse_u32_be;
use crate::AuthChip;

#[async_trait]
pub trait GenerateSignature<E>
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    /// Sign a 32-byte digest with the key in the given slot.
    ///
    /// The returned components are exactly what the chip produced; low-S
    /// normalization is a separate, mandatory step before submission.
    async fn generate_signature(
        transport: &E,
        key_index: u8,
        digest: &[u8],
    ) -> AuthAppResult<ChipSignature, E::Error>;
}

#[async_trait]
impl<E> GenerateSignature<E> for AuthChip
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    async fn generate_signature(
        transport: &E,
        key_index: u8,
        digest: &[u8],
    ) -> AuthAppResult<ChipSignature, E::Error> {
        if digest.len() != length::DIGEST_SIZE {
            return Err(AuthAppError::InvalidDigestLength {
                got: digest.len(),
                expected: length::DIGEST_SIZE,
            });
        }

        let command = ApduCommand {
            cla: Self::CLA,
            ins: ins::GENERATE_SIGNATURE,
            p1: key_index,
            p2: 0x00,
            data: digest.to_vec(),
            le: Some(0x00),
        };

        let response = transport
            .exchange(&command)
            .await
            .map_err(AuthAppError::from_transport)?;

        <AuthChip as AppExt<E>>::handle_response_error_signature(&response)
            .map_err(AuthAppError::Chip)?;

        parse_signature_response::<E::Error>(response.data())
    }
}

/// Parse a GENERATE SIGNATURE payload: 4B global counter, 4B key counter,
/// then the DER signature in the remaining bytes.
fn parse_signature_response<E: std::error::Error>(data: &[u8]) -> AuthAppResult<ChipSignature, E> {
    if data.len() <= length::SIGNATURE_COUNTERS_SIZE {
        return Err(AuthAppError::InvalidResponseData(format!(
            "signature payload is {} bytes (expected counters plus DER)",
            data.len()
        )));
    }

    let (global_counter, offset) = parse_u32_be(data, 0)?;
    let (key_counter, offset) = parse_u32_be(data, offset)?;

    let der_bytes = &data[offset..];
    let components = der::parse(der_bytes)?;

    Ok(ChipSignature {
        global_counter,
        key_counter,
        der: der_bytes.to_vec(),
        components,
    })
}
