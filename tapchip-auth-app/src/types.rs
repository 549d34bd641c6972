// SPDX-License-Identifier: Apache-2.0

//! Core types produced by the signing applet

use core::fmt;

use serde::{Deserialize, Serialize};

/// A 65-byte uncompressed secp256k1 public key (`0x04 ‖ X ‖ Y`).
///
/// Chip-produced and read-only; it doubles as the asset identity on chain.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ChipPublicKey([u8; 65]);

impl ChipPublicKey {
    /// Wrap raw SEC1 bytes. The caller guarantees the 0x04 prefix.
    pub const fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    /// Rebuild the key from bare X‖Y coordinates.
    pub fn from_coordinates(xy: &[u8; 64]) -> Self {
        let mut bytes = [0u8; 65];
        bytes[0] = 0x04;
        bytes[1..].copy_from_slice(xy);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ChipPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChipPublicKey({})", self.to_hex())
    }
}

impl fmt::Display for ChipPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ChipPublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChipPublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 65] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 65 bytes"))?;
        Ok(Self(bytes))
    }
}

/// Big-endian r and s, exactly 32 bytes each, from DER parsing.
///
/// Before submission `s` must be at or below the curve half-order; the
/// normalizer enforces that, the chip does not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignatureComponents {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl SignatureComponents {
    /// `r ‖ s` as the 64-byte wire form the contract takes.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// GET KEY INFO result: signature counters plus the public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInfo {
    /// Signatures remaining across all keys
    pub global_counter: u32,
    /// Signatures remaining for this key
    pub key_counter: u32,
    pub public_key: ChipPublicKey,
}

/// GENERATE SIGNATURE result before normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChipSignature {
    pub global_counter: u32,
    pub key_counter: u32,
    /// Raw DER bytes as returned by the chip, kept for diagnostics
    pub der: Vec<u8>,
    pub components: SignatureComponents,
}
