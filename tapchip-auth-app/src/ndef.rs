// SPDX-License-Identifier: Apache-2.0

//! NDEF well-known URI record codec.
//!
//! Only the URI record type (`U`, 0x55) is handled; the tag carries exactly
//! one such record pointing at the asset locator. The payload starts with a
//! 1-byte prefix code into the fixed abbreviation table, followed by the
//! UTF-8 remainder of the URI.

use thiserror::Error;

/// URI identifier codes 0x00..=0x23 from the NFC Forum URI record spec.
pub const URI_PREFIXES: [&str; 36] = [
    "",
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

const TNF_WELL_KNOWN: u8 = 0x01;
const FLAG_MESSAGE_BEGIN: u8 = 0x80;
const FLAG_MESSAGE_END: u8 = 0x40;
const FLAG_SHORT_RECORD: u8 = 0x10;
const TYPE_URI: u8 = 0x55;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NdefError {
    #[error("record truncated: {got} bytes, need at least {expected}")]
    Truncated { got: usize, expected: usize },

    #[error("record is not a well-known type (TNF {tnf:#04x})")]
    NotWellKnown { tnf: u8 },

    #[error("expected a single-byte URI type, found type length {type_length}")]
    UnexpectedTypeLength { type_length: u8 },

    #[error("record type {found:#04x} is not a URI record")]
    NotAUriRecord { found: u8 },

    #[error("payload length {declared} exceeds record body of {remaining} bytes")]
    PayloadOverrun { declared: usize, remaining: usize },

    #[error("empty URI payload")]
    EmptyPayload,

    #[error("reserved URI prefix code {code:#04x}")]
    ReservedPrefixCode { code: u8 },

    #[error("URI payload is not valid UTF-8")]
    Utf8,
}

/// Decode a single well-known URI record into the full URI string.
pub fn decode_uri_record(record: &[u8]) -> Result<String, NdefError> {
    if record.len() < 3 {
        return Err(NdefError::Truncated {
            got: record.len(),
            expected: 3,
        });
    }

    let header = record[0];
    if header & 0x07 != TNF_WELL_KNOWN {
        return Err(NdefError::NotWellKnown { tnf: header & 0x07 });
    }

    let type_length = record[1];
    if type_length != 1 {
        return Err(NdefError::UnexpectedTypeLength { type_length });
    }

    // short records carry a 1-byte payload length, long records 4 bytes BE
    let (payload_length, mut offset) = if header & FLAG_SHORT_RECORD != 0 {
        (record[2] as usize, 3usize)
    } else {
        if record.len() < 7 {
            return Err(NdefError::Truncated {
                got: record.len(),
                expected: 7,
            });
        }
        let len = u32::from_be_bytes([record[2], record[3], record[4], record[5]]) as usize;
        (len, 6)
    };

    if record.len() <= offset {
        return Err(NdefError::Truncated {
            got: record.len(),
            expected: offset + 1,
        });
    }
    if record[offset] != TYPE_URI {
        return Err(NdefError::NotAUriRecord {
            found: record[offset],
        });
    }
    offset += 1;

    let remaining = record.len() - offset;
    if payload_length > remaining {
        return Err(NdefError::PayloadOverrun {
            declared: payload_length,
            remaining,
        });
    }
    if payload_length == 0 {
        return Err(NdefError::EmptyPayload);
    }

    let payload = &record[offset..offset + payload_length];
    let code = payload[0];
    let prefix = URI_PREFIXES
        .get(code as usize)
        .ok_or(NdefError::ReservedPrefixCode { code })?;

    let rest = std::str::from_utf8(&payload[1..]).map_err(|_| NdefError::Utf8)?;

    Ok(format!("{prefix}{rest}"))
}

/// Encode a URI into a single short well-known record, abbreviating with
/// the longest matching prefix.
pub fn encode_uri_record(uri: &str) -> Vec<u8> {
    // index 0 is the empty prefix, the fallback when nothing matches
    let (code, prefix) = URI_PREFIXES
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, prefix)| uri.starts_with(**prefix))
        .max_by_key(|(_, prefix)| prefix.len())
        .unwrap_or((0, &""));

    let rest = &uri.as_bytes()[prefix.len()..];
    let payload_length = rest.len() + 1;

    let mut out = Vec::with_capacity(4 + payload_length);
    if payload_length <= u8::MAX as usize {
        out.push(FLAG_MESSAGE_BEGIN | FLAG_MESSAGE_END | FLAG_SHORT_RECORD | TNF_WELL_KNOWN);
        out.push(1);
        out.push(payload_length as u8);
    } else {
        out.push(FLAG_MESSAGE_BEGIN | FLAG_MESSAGE_END | TNF_WELL_KNOWN);
        out.push(1);
        out.extend_from_slice(&(payload_length as u32).to_be_bytes());
    }
    out.push(TYPE_URI);
    out.push(code as u8);
    out.extend_from_slice(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_https_record() {
        // D1 01 0B 55 04 "example.com" → https://example.com
        let mut record = vec![0xD1, 0x01, 0x0C, 0x55, 0x04];
        record.extend_from_slice(b"example.com");
        assert_eq!(decode_uri_record(&record).unwrap(), "https://example.com");
    }

    #[test]
    fn decodes_unabbreviated_record() {
        let mut record = vec![0xD1, 0x01, 0x09, 0x55, 0x00];
        record.extend_from_slice(b"web+x:ab");
        assert_eq!(decode_uri_record(&record).unwrap(), "web+x:ab");
    }

    #[test]
    fn decodes_long_record_header() {
        let body = b"example.com/very/long";
        let mut record = vec![0xC1, 0x01];
        record.extend_from_slice(&(body.len() as u32 + 1).to_be_bytes());
        record.push(0x55);
        record.push(0x04);
        record.extend_from_slice(body);
        assert_eq!(
            decode_uri_record(&record).unwrap(),
            format!("https://{}", std::str::from_utf8(body).unwrap())
        );
    }

    #[test]
    fn rejects_non_uri_type() {
        // type 'T' (text record)
        let record = vec![0xD1, 0x01, 0x03, 0x54, 0x02, 0x65, 0x6E];
        assert_eq!(
            decode_uri_record(&record).unwrap_err(),
            NdefError::NotAUriRecord { found: 0x54 }
        );
    }

    #[test]
    fn rejects_reserved_prefix_code() {
        let record = vec![0xD1, 0x01, 0x02, 0x55, 0x24, 0x61];
        assert_eq!(
            decode_uri_record(&record).unwrap_err(),
            NdefError::ReservedPrefixCode { code: 0x24 }
        );
    }

    #[test]
    fn rejects_overrun_payload_length() {
        let record = vec![0xD1, 0x01, 0x7F, 0x55, 0x04, 0x61];
        assert!(matches!(
            decode_uri_record(&record).unwrap_err(),
            NdefError::PayloadOverrun { declared: 0x7F, .. }
        ));
    }

    #[test]
    fn encode_picks_longest_prefix() {
        let record = encode_uri_record("https://www.example.com");
        // code 0x02 = "https://www." beats 0x04 = "https://"
        assert_eq!(record[4], 0x02);
        assert_eq!(&record[5..], b"example.com");
    }

    #[test]
    fn encode_decode_roundtrip() {
        for uri in [
            "https://merch.example/item/1",
            "tel:+123456789",
            "urn:nfc:ext",
            "custom-scheme:opaque",
        ] {
            let record = encode_uri_record(uri);
            assert_eq!(decode_uri_record(&record).unwrap(), uri);
        }
    }
}
