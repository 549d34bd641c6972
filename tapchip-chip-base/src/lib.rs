mod errors;

use async_trait::async_trait;
pub use errors::*;
use tapchip_transport::{ApduAnswer, ApduCommand, ApduErrorCode, Exchange};

// ISO 7816-4 inter-industry commands shared by every applet on the tag
const CLA_ISO: u8 = 0x00;
const INS_SELECT: u8 = 0xA4;
const INS_READ_BINARY: u8 = 0xB0;
const INS_UPDATE_BINARY: u8 = 0xD6;
const P1_SELECT_BY_AID: u8 = 0x04;
const P1_SELECT_BY_FILE_ID: u8 = 0x00;
const P2_SELECT_FIRST: u8 = 0x0C;
const BINARY_CHUNK_SIZE: usize = 250;

/// Defines what we can consider an applet on the tag
pub trait App {
    /// Applet's APDU CLA
    const CLA: u8;
    /// Applet identifier sent in SELECT
    const AID: &'static [u8];
}

#[async_trait]
pub trait AppExt<E>: App
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    /// Check APDU status word. Ok on 0x9000, otherwise map to a typed error.
    fn handle_response_error(
        response: &ApduAnswer<E::AnswerType>,
    ) -> Result<(), ChipAppError<E::Error>> {
        match response.error_code() {
            Ok(ApduErrorCode::NoError) => Ok(()),
            Ok(err) => Err(ChipAppError::Status(err as u16, err.description())),
            Err(word) => Err(ChipAppError::UnknownStatus(word)),
        }
    }

    /// Same as `handle_response_error`, but also requires a non-empty payload (signature).
    fn handle_response_error_signature(
        response: &ApduAnswer<E::AnswerType>,
    ) -> Result<(), ChipAppError<E::Error>> {
        match response.error_code() {
            Ok(ApduErrorCode::NoError) if response.data().is_empty() => {
                Err(ChipAppError::NoSignature)
            }
            Ok(ApduErrorCode::NoError) => Ok(()),
            Ok(err) => Err(ChipAppError::Status(err as u16, err.description())),
            Err(word) => Err(ChipAppError::UnknownStatus(word)),
        }
    }

    /// SELECT the implementing applet by AID. Returns the FCI payload.
    async fn select(transport: &E) -> Result<Vec<u8>, ChipAppError<E::Error>> {
        let command = ApduCommand {
            cla: CLA_ISO,
            ins: INS_SELECT,
            p1: P1_SELECT_BY_AID,
            p2: 0x00,
            data: Self::AID.to_vec(),
            le: None,
        };

        let response = transport.exchange(&command).await?;
        Self::handle_response_error(&response)?;

        Ok(response.data().to_vec())
    }

    /// SELECT an elementary file inside the currently selected applet.
    async fn select_file(transport: &E, file_id: u16) -> Result<(), ChipAppError<E::Error>> {
        let command = ApduCommand {
            cla: CLA_ISO,
            ins: INS_SELECT,
            p1: P1_SELECT_BY_FILE_ID,
            p2: P2_SELECT_FIRST,
            data: file_id.to_be_bytes().to_vec(),
            le: None,
        };

        let response = transport.exchange(&command).await?;
        Self::handle_response_error(&response)
    }

    /// READ BINARY from the selected file, chunked on the offset in P1/P2.
    async fn read_binary(
        transport: &E,
        offset: u16,
        length: usize,
    ) -> Result<Vec<u8>, ChipAppError<E::Error>> {
        let mut out = Vec::with_capacity(length);
        let mut position = offset as usize;
        let end = offset as usize + length;

        while position < end {
            let chunk = std::cmp::min(end - position, BINARY_CHUNK_SIZE);
            let command: ApduCommand<Vec<u8>> = ApduCommand {
                cla: CLA_ISO,
                ins: INS_READ_BINARY,
                p1: ((position >> 8) & 0xFF) as u8,
                p2: (position & 0xFF) as u8,
                data: Vec::new(),
                le: Some(chunk as u8),
            };

            let response = transport.exchange(&command).await?;
            Self::handle_response_error(&response)?;

            let data = response.data();
            if data.is_empty() {
                return Err(ChipAppError::ResponseTooShort {
                    got: out.len(),
                    expected: length,
                });
            }

            out.extend_from_slice(data);
            position += data.len();
        }

        out.truncate(length);
        Ok(out)
    }

    /// UPDATE BINARY into the selected file, chunked on the offset in P1/P2.
    async fn update_binary(
        transport: &E,
        offset: u16,
        body: &[u8],
    ) -> Result<(), ChipAppError<E::Error>> {
        if body.is_empty() {
            return Err(ChipAppError::InvalidEmptyBody);
        }
        if offset as usize + body.len() > u16::MAX as usize {
            return Err(ChipAppError::BodyTooLarge {
                size: body.len(),
                max: u16::MAX as usize - offset as usize,
            });
        }

        let mut position = offset as usize;
        for chunk in body.chunks(BINARY_CHUNK_SIZE) {
            let command = ApduCommand {
                cla: CLA_ISO,
                ins: INS_UPDATE_BINARY,
                p1: ((position >> 8) & 0xFF) as u8,
                p2: (position & 0xFF) as u8,
                data: chunk.to_vec(),
                le: None,
            };

            let response = transport.exchange(&command).await?;
            Self::handle_response_error(&response)?;

            position += chunk.len();
        }

        Ok(())
    }
}

impl<T, E> AppExt<E> for T
where
    T: App,
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
}
