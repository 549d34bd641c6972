// SPDX-License-Identifier: Apache-2.0

//! GET KEY INFO command implementation

use async_trait::async_trait;
use tapchip_chip_base::{App, AppExt};
use tapchip_transport::{ApduCommand, Exchange};

use crate::errors::{AuthAppError, AuthAppResult};
use crate::instructions::{ins, length, point_format};
use crate::types::{ChipPublicKey, KeyInfo};
use crate::utils::parse_u32_be;
use crate::AuthChip;

#[async_trait]
pub trait GetKeyInfo<E>
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    /// Read the public key and signature counters for the given key slot
    async fn get_key_info(transport: &E, key_index: u8) -> AuthAppResult<KeyInfo, E::Error>;
}

#[async_trait]
impl<E> GetKeyInfo<E> for AuthChip
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    async fn get_key_info(transport: &E, key_index: u8) -> AuthAppResult<KeyInfo, E::Error> {
        let command: ApduCommand<Vec<u8>> = ApduCommand {
            cla: Self::CLA,
            ins: ins::GET_KEY_INFO,
            p1: key_index,
            p2: 0x00,
            data: Vec::new(),
            le: Some(0x00),
        };

        let response = transport.exchange(&command).await.map_err(AuthAppError::from_transport)?;

        <AuthChip as AppExt<E>>::handle_response_error(&response).map_err(AuthAppError::Chip)?;

        parse_key_info_response::<E::Error>(response.data())
    }
}

/// Parse a GET KEY INFO payload: 4B global counter, 4B key counter, 1B
/// point-format marker, then 64 bytes of X‖Y re-prefixed with 0x04.
fn parse_key_info_response<E: std::error::Error>(data: &[u8]) -> AuthAppResult<KeyInfo, E> {
    let expected = length::KEY_INFO_HEADER_SIZE + 2 * length::COORDINATE_SIZE;
    if data.len() < expected {
        return Err(AuthAppError::InvalidResponseData(format!(
            "key info payload is {} bytes (expected {})",
            data.len(),
            expected
        )));
    }

    let (global_counter, offset) = parse_u32_be(data, 0)?;
    let (key_counter, offset) = parse_u32_be(data, offset)?;

    let marker = data[offset];
    if marker != point_format::UNCOMPRESSED {
        return Err(AuthAppError::InvalidResponseData(format!(
            "unexpected point-format marker {marker:#04x}"
        )));
    }

    let xy_start = offset + 1;
    let xy: &[u8; 64] = data[xy_start..xy_start + 2 * length::COORDINATE_SIZE]
        .try_into()
        .expect("slice length checked above");

    Ok(KeyInfo {
        global_counter,
        key_counter,
        public_key: ChipPublicKey::from_coordinates(xy),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_info_payload(global: u32, per_key: u32, xy: [u8; 64]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend(global.to_be_bytes());
        payload.extend(per_key.to_be_bytes());
        payload.push(0x04);
        payload.extend(xy);
        payload
    }

    #[test]
    fn parses_counters_and_key() {
        let payload = key_info_payload(999_990, 100_000, [0xCD; 64]);
        let info = parse_key_info_response::<std::io::Error>(&payload).unwrap();

        assert_eq!(info.global_counter, 999_990);
        assert_eq!(info.key_counter, 100_000);
        assert_eq!(info.public_key.as_bytes()[0], 0x04);
        assert_eq!(&info.public_key.as_bytes()[1..], &[0xCD; 64]);
    }

    #[test]
    fn rejects_short_payload() {
        let payload = key_info_payload(1, 1, [0u8; 64]);
        let result = parse_key_info_response::<std::io::Error>(&payload[..40]);
        assert!(matches!(
            result.unwrap_err(),
            AuthAppError::InvalidResponseData(_)
        ));
    }

    #[test]
    fn rejects_unknown_point_marker() {
        let mut payload = key_info_payload(1, 1, [0u8; 64]);
        payload[8] = 0x02; // compressed marker is not supported
        let result = parse_key_info_response::<std::io::Error>(&payload);
        assert!(matches!(
            result.unwrap_err(),
            AuthAppError::InvalidResponseData(_)
        ));
    }
}
