// SPDX-License-Identifier: Apache-2.0

//! Byte-level helpers shared by the command parsers

use crate::errors::{AuthAppError, AuthAppResult};

/// Read a big-endian u32 at `offset`, returning the value and new offset.
pub fn parse_u32_be<E: std::error::Error>(
    data: &[u8],
    offset: usize,
) -> AuthAppResult<(u32, usize), E> {
    let end = offset + 4;
    if end > data.len() {
        return Err(AuthAppError::InvalidResponseData(format!(
            "need 4 bytes at offset {}, have {}",
            offset,
            data.len().saturating_sub(offset)
        )));
    }
    let value = u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]);
    Ok((value, end))
}

/// Take exactly `N` bytes at `offset`.
pub fn take_array<const N: usize, E: std::error::Error>(
    data: &[u8],
    offset: usize,
) -> AuthAppResult<([u8; N], usize), E> {
    let end = offset + N;
    if end > data.len() {
        return Err(AuthAppError::InvalidResponseData(format!(
            "need {} bytes at offset {}, have {}",
            N,
            offset,
            data.len().saturating_sub(offset)
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..end]);
    Ok((out, end))
}
