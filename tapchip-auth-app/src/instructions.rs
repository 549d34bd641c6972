// SPDX-License-Identifier: Apache-2.0

//! APDU instruction constants for the signing applet and the tag's NDEF applet

/// Applet identifiers sent in SELECT
pub mod aid {
    /// Signing applet
    pub const AUTH_APPLET: &[u8] = &[
        0xD2, 0x76, 0x00, 0x00, 0x04, 0x15, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
    ];
    /// Type 4 tag NDEF applet
    pub const NDEF_APPLET: &[u8] = &[0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];
}

/// APDU instruction codes for the signing applet
pub mod ins {
    /// GET KEY INFO (key index → counters + public key)
    pub const GET_KEY_INFO: u8 = 0x16;
    /// GENERATE SIGNATURE (key index + 32-byte digest → counters + DER signature)
    pub const GENERATE_SIGNATURE: u8 = 0x18;
}

/// Elementary file identifiers inside the NDEF applet
pub mod file {
    /// Capability container
    pub const CAPABILITY_CONTAINER: u16 = 0xE103;
    /// NDEF message file (2-byte NLEN followed by the message)
    pub const NDEF: u16 = 0xE104;
}

/// Data length constants
pub mod length {
    /// 4-byte signature counters (one global, one per key)
    pub const COUNTER_SIZE: usize = 4;
    /// GET KEY INFO header: two counters plus the point-format marker
    pub const KEY_INFO_HEADER_SIZE: usize = 2 * COUNTER_SIZE + 1;
    /// X and Y coordinate, each
    pub const COORDINATE_SIZE: usize = 32;
    /// Uncompressed SEC1 public key (0x04 ‖ X ‖ Y)
    pub const PUBLIC_KEY_SIZE: usize = 65;
    /// Digest passed to GENERATE SIGNATURE
    pub const DIGEST_SIZE: usize = 32;
    /// Counters prefixed to the DER signature in a GENERATE SIGNATURE response
    pub const SIGNATURE_COUNTERS_SIZE: usize = 2 * COUNTER_SIZE;
    /// Signature component (r or s)
    pub const SIGNATURE_COMPONENT_SIZE: usize = 32;
    /// NLEN prefix of the NDEF file
    pub const NDEF_LENGTH_PREFIX_SIZE: usize = 2;
}

/// SEC1 point-format markers
pub mod point_format {
    /// Uncompressed point, 0x04 ‖ X ‖ Y
    pub const UNCOMPRESSED: u8 = 0x04;
}
