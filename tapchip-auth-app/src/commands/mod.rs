// SPDX-License-Identifier: Apache-2.0

//! Command implementations for the signing applet and the tag's NDEF applet

pub mod generate_signature;
pub mod get_key_info;
pub mod tag;

pub use generate_signature::GenerateSignature;
pub use get_key_info::GetKeyInfo;
pub use tag::{NdefTag, TagRecords};
