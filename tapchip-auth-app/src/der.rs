// SPDX-License-Identifier: Apache-2.0

//! DER parsing for the ECDSA signatures the chip emits.
//!
//! The chip always produces the fixed shape `30 L 02 Lr r 02 Ls s`. Length
//! fields may be short-form (one byte, top bit clear) or long-form (top bit
//! set, low seven bits = count of following big-endian length bytes).
//! Malformed structure fails immediately; there is no best-effort recovery.

use thiserror::Error;

use crate::types::SignatureComponents;

/// Malformed DER signature. Carries the offending bytes where feasible.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DerError {
    #[error("signature truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("expected tag {expected:#04x} at offset {offset}, found {found:#04x}")]
    UnexpectedTag {
        offset: usize,
        expected: u8,
        found: u8,
    },

    #[error("length field uses {count} length bytes (max 4)")]
    LengthTooWide { count: usize },

    #[error("declared length {declared} exceeds remaining {remaining} bytes")]
    LengthOverrun { declared: usize, remaining: usize },
}

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, DerError> {
        let b = *self
            .bytes
            .get(self.offset)
            .ok_or(DerError::Truncated { offset: self.offset })?;
        self.offset += 1;
        Ok(b)
    }

    fn expect_tag(&mut self, expected: u8) -> Result<(), DerError> {
        let offset = self.offset;
        let found = self.byte()?;
        if found != expected {
            return Err(DerError::UnexpectedTag {
                offset,
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Short-form or long-form length field.
    fn length(&mut self) -> Result<usize, DerError> {
        let first = self.byte()?;
        if first & 0x80 == 0 {
            return Ok(first as usize);
        }

        let count = (first & 0x7F) as usize;
        if count > 4 {
            return Err(DerError::LengthTooWide { count });
        }

        let mut value = 0usize;
        for _ in 0..count {
            value = (value << 8) | self.byte()? as usize;
        }
        Ok(value)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DerError> {
        let remaining = self.bytes.len() - self.offset;
        if len > remaining {
            return Err(DerError::LengthOverrun {
                declared: len,
                remaining,
            });
        }
        let out = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(out)
    }

    fn integer(&mut self) -> Result<[u8; 32], DerError> {
        self.expect_tag(TAG_INTEGER)?;
        let len = self.length()?;
        let raw = self.take(len)?;
        Ok(normalize_component(raw))
    }
}

/// Force a DER integer into exactly 32 big-endian bytes: strip one leading
/// sign-padding zero, left-pad short values, keep the trailing 32 bytes of
/// anything still longer (deployed chips pad inconsistently).
fn normalize_component(raw: &[u8]) -> [u8; 32] {
    let trimmed = if raw.len() == 33 && raw[0] == 0x00 {
        &raw[1..]
    } else {
        raw
    };

    let mut out = [0u8; 32];
    if trimmed.len() <= 32 {
        out[32 - trimmed.len()..].copy_from_slice(trimmed);
    } else {
        out.copy_from_slice(&trimmed[trimmed.len() - 32..]);
    }
    out
}

/// Parse a chip signature into its 32-byte r and s components.
pub fn parse(der: &[u8]) -> Result<SignatureComponents, DerError> {
    let mut reader = Reader {
        bytes: der,
        offset: 0,
    };

    reader.expect_tag(TAG_SEQUENCE)?;
    let body_len = reader.length()?;
    let remaining = der.len() - reader.offset;
    if body_len > remaining {
        return Err(DerError::LengthOverrun {
            declared: body_len,
            remaining,
        });
    }

    let r = reader.integer()?;
    let s = reader.integer()?;

    Ok(SignatureComponents { r, s })
}

/// Encode (r, s) back into minimal DER. Inverse of [`parse`], used by
/// round-trip tests and mock chips.
pub fn encode(r: &[u8; 32], s: &[u8; 32]) -> Vec<u8> {
    fn integer(out: &mut Vec<u8>, value: &[u8; 32]) {
        let mut start = 0;
        while start < 31 && value[start] == 0 {
            start += 1;
        }
        let body = &value[start..];

        out.push(TAG_INTEGER);
        if body[0] & 0x80 != 0 {
            out.push(body.len() as u8 + 1);
            out.push(0x00);
        } else {
            out.push(body.len() as u8);
        }
        out.extend_from_slice(body);
    }

    let mut body = Vec::with_capacity(72);
    integer(&mut body, r);
    integer(&mut body, s);

    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(TAG_SEQUENCE);
    out.push(body.len() as u8);
    out.extend(body);
    out
}
