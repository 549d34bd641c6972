// SPDX-License-Identifier: Apache-2.0

//! Type 4 tag NDEF file access: reading and writing the asset-locator URI

use async_trait::async_trait;
use tapchip_chip_base::{App, AppExt};
use tapchip_transport::Exchange;

use crate::errors::{AuthAppError, AuthAppResult};
use crate::instructions::{aid, file, length};
use crate::ndef;

/// The tag's NDEF applet (distinct CLA-less ISO file access)
#[derive(Debug, Clone)]
pub struct NdefTag;

impl App for NdefTag {
    const CLA: u8 = 0x00;
    const AID: &'static [u8] = aid::NDEF_APPLET;
}

#[async_trait]
pub trait TagRecords<E>
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    /// Read the URI stored in the tag's NDEF file
    async fn read_uri(transport: &E) -> AuthAppResult<String, E::Error>;

    /// Replace the tag's NDEF file content with a single URI record
    async fn write_uri(transport: &E, uri: &str) -> AuthAppResult<(), E::Error>;
}

#[async_trait]
impl<E> TagRecords<E> for NdefTag
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    async fn read_uri(transport: &E) -> AuthAppResult<String, E::Error> {
        Self::select(transport).await?;
        Self::select_file(transport, file::NDEF).await?;

        // NLEN prefix, then the message body
        let nlen_bytes = Self::read_binary(transport, 0, length::NDEF_LENGTH_PREFIX_SIZE).await?;
        let nlen = u16::from_be_bytes([nlen_bytes[0], nlen_bytes[1]]) as usize;
        if nlen == 0 {
            return Err(AuthAppError::InvalidResponseData(
                "tag NDEF file is empty".to_string(),
            ));
        }

        let record =
            Self::read_binary(transport, length::NDEF_LENGTH_PREFIX_SIZE as u16, nlen).await?;

        Ok(ndef::decode_uri_record(&record)?)
    }

    async fn write_uri(transport: &E, uri: &str) -> AuthAppResult<(), E::Error> {
        let record = ndef::encode_uri_record(uri);
        let nlen = record.len() as u16;

        Self::select(transport).await?;
        Self::select_file(transport, file::NDEF).await?;

        // zero NLEN while the body is in flux, then body, then real NLEN,
        // so a torn write never leaves a reader a half-valid message
        Self::update_binary(transport, 0, &[0x00, 0x00]).await?;
        Self::update_binary(transport, length::NDEF_LENGTH_PREFIX_SIZE as u16, &record).await?;
        Self::update_binary(transport, 0, &nlen.to_be_bytes()).await?;

        Ok(())
    }
}
