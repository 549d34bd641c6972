// SPDX-License-Identifier: Apache-2.0

//! Recovery-id resolution.
//!
//! The contract verifies by public-key recovery, so the submission must
//! carry the id of the one candidate point that equals the chip's key.
//! This is a pure function over (digest, signature, expected key) with no
//! hidden state: try ids 0..=3, compare the recovered uncompressed point
//! byte-for-byte.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

use crate::types::{ChipPublicKey, SignatureComponents};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecoverError {
    /// r/s do not form a valid scalar pair on the curve
    #[error("signature components are not valid curve scalars")]
    InvalidComponents,

    /// No candidate id recovers the expected key. Retrying without
    /// re-signing cannot change the outcome.
    #[error("no recovery id in 0..=3 recovers the expected public key")]
    NoMatch,
}

/// Recover the candidate public key for one id, if that id yields a point.
pub fn recover_candidate(
    digest: &[u8; 32],
    components: &SignatureComponents,
    candidate: u8,
) -> Result<Option<[u8; 65]>, RecoverError> {
    let signature = Signature::from_scalars(components.r, components.s)
        .map_err(|_| RecoverError::InvalidComponents)?;

    let Some(id) = RecoveryId::from_byte(candidate) else {
        return Ok(None);
    };

    match VerifyingKey::recover_from_prehash(digest, &signature, id) {
        Ok(key) => {
            let point = key.to_encoded_point(false);
            let bytes: [u8; 65] = point
                .as_bytes()
                .try_into()
                .expect("uncompressed secp256k1 point is 65 bytes");
            Ok(Some(bytes))
        }
        // some ids simply have no valid point for this (digest, r, s)
        Err(_) => Ok(None),
    }
}

/// Resolve the recovery id matching `expected`. Exactly one id matches for
/// a signature the chip really produced over `digest`; zero matches is
/// fatal for the attempt.
pub fn resolve_recovery_id(
    digest: &[u8; 32],
    components: &SignatureComponents,
    expected: &ChipPublicKey,
) -> Result<u8, RecoverError> {
    for candidate in 0..=3u8 {
        if let Some(recovered) = recover_candidate(digest, components, candidate)? {
            if &recovered == expected.as_bytes() {
                return Ok(candidate);
            }
        }
    }
    Err(RecoverError::NoMatch)
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::SigningKey;
    use rand_core::OsRng;

    use super::*;

    fn chip_key_of(signing_key: &SigningKey) -> ChipPublicKey {
        let point = signing_key.verifying_key().to_encoded_point(false);
        ChipPublicKey::from_bytes(point.as_bytes().try_into().unwrap())
    }

    #[test]
    fn resolves_the_id_used_at_signing() {
        let signing_key = SigningKey::random(&mut OsRng);
        let digest = [0x42u8; 32];

        let (signature, id) = signing_key.sign_prehash_recoverable(&digest).unwrap();
        let (r, s) = signature.split_bytes();
        let components = SignatureComponents {
            r: r.into(),
            s: s.into(),
        };

        let resolved =
            resolve_recovery_id(&digest, &components, &chip_key_of(&signing_key)).unwrap();
        assert_eq!(resolved, id.to_byte());
    }

    #[test]
    fn unrelated_key_never_matches() {
        let signing_key = SigningKey::random(&mut OsRng);
        let other_key = SigningKey::random(&mut OsRng);
        let digest = [0x42u8; 32];

        let (signature, _) = signing_key.sign_prehash_recoverable(&digest).unwrap();
        let (r, s) = signature.split_bytes();
        let components = SignatureComponents {
            r: r.into(),
            s: s.into(),
        };

        assert_eq!(
            resolve_recovery_id(&digest, &components, &chip_key_of(&other_key)),
            Err(RecoverError::NoMatch)
        );
    }

    #[test]
    fn zero_scalars_are_rejected() {
        let components = SignatureComponents {
            r: [0; 32],
            s: [0; 32],
        };
        assert_eq!(
            resolve_recovery_id(&[0x01; 32], &components, &ChipPublicKey::from_bytes([4; 65])),
            Err(RecoverError::InvalidComponents)
        );
    }
}
