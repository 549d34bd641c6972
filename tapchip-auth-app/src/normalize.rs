// SPDX-License-Identifier: Apache-2.0

//! Low-S normalization for chip signatures.
//!
//! The on-chain verifier accepts only canonical low-S signatures; the chip
//! gives no such guarantee, so every s passes through here before
//! submission. Comparison and subtraction are plain byte-wise big-endian
//! arithmetic on the 32-byte component.

use std::cmp::Ordering;

use crate::types::SignatureComponents;

/// secp256k1 curve order n (big-endian)
pub const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// secp256k1 half curve order n/2 (big-endian)
pub const HALF_CURVE_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Big-endian comparison of two 32-byte integers.
fn compare_be(a: &[u8; 32], b: &[u8; 32]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Byte-wise `a - b` with borrow. Caller guarantees `a >= b`.
fn subtract_be(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut borrow = 0u16;
    for i in (0..32).rev() {
        let lhs = a[i] as u16;
        let rhs = b[i] as u16 + borrow;
        if lhs >= rhs {
            out[i] = (lhs - rhs) as u8;
            borrow = 0;
        } else {
            out[i] = (lhs + 0x100 - rhs) as u8;
            borrow = 1;
        }
    }
    out
}

/// Whether s already sits in the lower half of the curve order.
pub fn is_low_s(s: &[u8; 32]) -> bool {
    compare_be(s, &HALF_CURVE_ORDER) != Ordering::Greater
}

/// Return the canonical s: unchanged when already low, `n − s` otherwise.
/// Idempotent.
pub fn normalize_s(s: [u8; 32]) -> [u8; 32] {
    if is_low_s(&s) {
        s
    } else {
        subtract_be(&CURVE_ORDER, &s)
    }
}

/// Normalize a full component pair, reporting whether s was flipped.
pub fn normalize(components: SignatureComponents) -> (SignatureComponents, bool) {
    let flipped = !is_low_s(&components.s);
    (
        SignatureComponents {
            r: components.r,
            s: normalize_s(components.s),
        },
        flipped,
    )
}
