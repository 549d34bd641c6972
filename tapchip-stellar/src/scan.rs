// SPDX-License-Identifier: Apache-2.0

//! Scanned tag-URL parsing: extracting the contract id and token id from
//! the asset locator stored on a tag.

use serde::{Deserialize, Serialize};

use crate::errors::AuthError;
use crate::strkey;

/// The identifiers a tag URI binds a chip to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedItem {
    /// 56-character contract address starting with 'C'
    pub contract_id: String,
    /// Token id path segment, when the tag already names a minted token
    pub token_id: Option<String>,
}

/// Parse the URL decoded from the tag's URI record.
///
/// Any scheme is trimmed, the rest splits on '/', and the contract id is
/// the first segment that is exactly 56 characters starting with 'C' and
/// structurally valid base32. A following all-digit segment is the token.
pub fn parse_scanned_url(url: &str) -> Result<ScannedItem, AuthError> {
    let without_scheme = match url.find("://") {
        Some(pos) => &url[pos + 3..],
        None => url,
    };

    let mut segments = without_scheme.split('/');

    while let Some(segment) = segments.next() {
        if segment.len() == 56 && segment.starts_with('C') {
            strkey::decode_contract_id(segment)?;

            let token_id = segments
                .next()
                .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
                .map(str::to_string);

            return Ok(ScannedItem {
                contract_id: segment.to_string(),
                token_id,
            });
        }
    }

    Err(AuthError::AddressFormat {
        detail: format!("no contract id segment in tag URL: {url}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract_address() -> String {
        strkey::encode_contract_id(&[3u8; 32])
    }

    #[test]
    fn extracts_contract_and_token() {
        let url = format!("https://merch.example/{}/42", contract_address());
        let item = parse_scanned_url(&url).unwrap();
        assert_eq!(item.contract_id, contract_address());
        assert_eq!(item.token_id.as_deref(), Some("42"));
    }

    #[test]
    fn token_id_is_optional() {
        let url = format!("https://merch.example/{}", contract_address());
        let item = parse_scanned_url(&url).unwrap();
        assert_eq!(item.token_id, None);
    }

    #[test]
    fn scheme_is_optional() {
        let url = format!("merch.example/{}/7", contract_address());
        let item = parse_scanned_url(&url).unwrap();
        assert_eq!(item.token_id.as_deref(), Some("7"));
    }

    #[test]
    fn non_numeric_trailing_segment_is_not_a_token() {
        let url = format!("https://merch.example/{}/about", contract_address());
        let item = parse_scanned_url(&url).unwrap();
        assert_eq!(item.token_id, None);
    }

    #[test]
    fn rejects_url_without_contract_segment() {
        let err = parse_scanned_url("https://merch.example/shop/42").unwrap_err();
        assert!(matches!(err, AuthError::AddressFormat { .. }));
    }

    #[test]
    fn rejects_invalid_base32_in_contract_segment() {
        // right shape (56 chars, leading C) but illegal characters
        let bogus = format!("C{}", "1".repeat(55));
        let err = parse_scanned_url(&format!("https://x.example/{bogus}")).unwrap_err();
        assert!(matches!(err, AuthError::AddressFormat { .. }));
    }
}
