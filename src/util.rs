//! Client-side helpers.
//!
//! [`uuids`] generates document ids locally when a round trip to the
//! server's `_uuids` endpoint is not wanted.

use std::fmt::Write as _;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;

/// Number of random bytes in each generated id.
pub const UUID_BYTES: usize = 16;

/// How generated ids are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UuidEncoding {
    /// 32 lowercase hex characters, the server's own format.
    #[default]
    Hex,
    /// 22 URL-safe base64 characters without padding.
    Base64,
}

/// Generates `count` random ids. A count of zero yields one id.
///
/// # Example
///
/// ```rust
/// use couch_api::util::{uuids, UuidEncoding};
///
/// let ids = uuids(3, UuidEncoding::Hex);
/// assert_eq!(ids.len(), 3);
/// assert!(ids.iter().all(|id| id.len() == 32));
/// ```
#[must_use]
pub fn uuids(count: usize, encoding: UuidEncoding) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count.max(1))
        .map(|_| {
            let bytes: [u8; UUID_BYTES] = rng.gen();
            match encoding {
                UuidEncoding::Hex => bytes.iter().fold(String::with_capacity(32), |mut out, b| {
                    let _ = write!(out, "{b:02x}");
                    out
                }),
                UuidEncoding::Base64 => URL_SAFE_NO_PAD.encode(bytes),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hex_ids_are_lowercase_hex() {
        let ids = uuids(5, UuidEncoding::Hex);
        assert_eq!(ids.len(), 5);
        for id in &ids {
            assert_eq!(id.len(), 32);
            assert!(id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }

    #[test]
    fn test_base64_ids_are_url_safe() {
        let ids = uuids(4, UuidEncoding::Base64);
        for id in &ids {
            assert_eq!(id.len(), 22);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn test_zero_count_yields_one() {
        assert_eq!(uuids(0, UuidEncoding::default()).len(), 1);
    }

    #[test]
    fn test_ids_are_distinct() {
        let ids: HashSet<_> = uuids(100, UuidEncoding::Hex).into_iter().collect();
        assert_eq!(ids.len(), 100);
    }
}
