//! Checksummed, ASCII-safe serialization of raw byte buffers.
//!
//! Wire layout before hex encoding:
//! ```text
//! HEADER (4 bytes) || PAYLOAD (varies) || CHECKSUM (4 bytes)
//! ```
//! The checksum is the truncated SHA-256 of `HEADER || PAYLOAD`. It
//! detects corruption and truncation (keys pasted into config files,
//! edited in text editors); it is not a security boundary.

use sha2::{Digest, Sha256};

use crate::bytes::{checked_slice, constant_time_eq};
use crate::error::{CryptoError, Result};

/// Size of the serialization header in bytes
pub const SERIALIZE_HEADER_BYTES: usize = 4;

/// Size of the truncated SHA-256 checksum in bytes
pub const CHECKSUM_BYTE_SIZE: usize = 4;

fn checksum(header: &[u8], payload: &[u8]) -> [u8; CHECKSUM_BYTE_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(header);
    hasher.update(payload);
    let digest = hasher.finalize();
    let mut out = [0u8; CHECKSUM_BYTE_SIZE];
    out.copy_from_slice(&digest[..CHECKSUM_BYTE_SIZE]);
    out
}

/// Serialize `header || payload || checksum` as a hex string.
pub fn save_bytes_to_checksummed_ascii(
    header: &[u8; SERIALIZE_HEADER_BYTES],
    payload: &[u8],
) -> String {
    let sum = checksum(header, payload);
    let mut bytes = Vec::with_capacity(SERIALIZE_HEADER_BYTES + payload.len() + CHECKSUM_BYTE_SIZE);
    bytes.extend_from_slice(header);
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&sum);
    hex::encode(bytes)
}

/// Parse a hex string produced by [`save_bytes_to_checksummed_ascii`],
/// validating the header and checksum, and return the payload.
pub fn load_bytes_from_checksummed_ascii(
    expected_header: &[u8; SERIALIZE_HEADER_BYTES],
    ascii: &str,
) -> Result<Vec<u8>> {
    let bytes = hex::decode(ascii)
        .map_err(|_| CryptoError::BadFormat("not a hex string".into()))?;

    let header = checked_slice(&bytes, 0, SERIALIZE_HEADER_BYTES)
        .ok_or_else(|| CryptoError::BadFormat("invalid header".into()))?;
    if header != expected_header.as_slice() {
        return Err(CryptoError::BadFormat("invalid header".into()));
    }

    let payload_len = bytes
        .len()
        .checked_sub(SERIALIZE_HEADER_BYTES + CHECKSUM_BYTE_SIZE)
        .ok_or_else(|| CryptoError::BadFormat("checksum mismatch".into()))?;
    let payload = checked_slice(&bytes, SERIALIZE_HEADER_BYTES, payload_len)
        .ok_or_else(|| CryptoError::BadFormat("checksum mismatch".into()))?;
    let stored_sum = &bytes[SERIALIZE_HEADER_BYTES + payload_len..];

    if !constant_time_eq(&checksum(header, payload), stored_sum) {
        return Err(CryptoError::BadFormat("checksum mismatch".into()));
    }

    Ok(payload.to_vec())
}

/// Strip trailing CR, LF, TAB, NUL, and SPACE characters.
///
/// Text editors commonly append these when a key is saved to a file.
/// Idempotent; a no-op on already-clean input.
pub fn trim_trailing_whitespace(s: &str) -> &str {
    s.trim_end_matches(['\r', '\n', '\t', '\0', ' '])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::secure_random;

    const HEADER: [u8; 4] = [0xAA, 0xBB, 0xCC, 0xDD];

    #[test]
    fn roundtrip_various_payload_lengths() {
        for len in [0usize, 1, 2, 31, 32, 33, 64] {
            let payload = if len == 0 {
                Vec::new()
            } else {
                secure_random(len).unwrap()
            };
            let ascii = save_bytes_to_checksummed_ascii(&HEADER, &payload);
            let decoded = load_bytes_from_checksummed_ascii(&HEADER, &ascii).unwrap();
            assert_eq!(decoded, payload, "len {len}");
        }
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let payload = secure_random(32).unwrap();
        let ascii = save_bytes_to_checksummed_ascii(&HEADER, &payload);

        // Flip the last hex digit (inside the checksum region).
        let mut corrupted: Vec<u8> = ascii.into_bytes();
        let last = corrupted.last_mut().unwrap();
        *last = if *last == b'0' { b'1' } else { b'0' };
        let corrupted = String::from_utf8(corrupted).unwrap();

        let err = load_bytes_from_checksummed_ascii(&HEADER, &corrupted).unwrap_err();
        assert!(matches!(err, CryptoError::BadFormat(m) if m == "checksum mismatch"));
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let payload = secure_random(32).unwrap();
        let mut ascii = save_bytes_to_checksummed_ascii(&HEADER, &payload).into_bytes();
        // Corrupt a payload nibble, leaving header and checksum intact.
        let i = 2 * SERIALIZE_HEADER_BYTES;
        ascii[i] = if ascii[i] == b'f' { b'e' } else { b'f' };
        let ascii = String::from_utf8(ascii).unwrap();

        let err = load_bytes_from_checksummed_ascii(&HEADER, &ascii).unwrap_err();
        assert!(matches!(err, CryptoError::BadFormat(m) if m == "checksum mismatch"));
    }

    #[test]
    fn wrong_header_is_rejected() {
        let payload = secure_random(32).unwrap();
        let ascii = save_bytes_to_checksummed_ascii(&HEADER, &payload);
        let other = [0x11, 0x22, 0x33, 0x44];
        let err = load_bytes_from_checksummed_ascii(&other, &ascii).unwrap_err();
        assert!(matches!(err, CryptoError::BadFormat(m) if m == "invalid header"));
    }

    #[test]
    fn non_hex_input_is_rejected() {
        let payload = secure_random(32).unwrap();
        let mut ascii = save_bytes_to_checksummed_ascii(&HEADER, &payload);
        ascii.replace_range(0..1, "Z");
        let err = load_bytes_from_checksummed_ascii(&HEADER, &ascii).unwrap_err();
        assert!(matches!(err, CryptoError::BadFormat(m) if m == "not a hex string"));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let err = load_bytes_from_checksummed_ascii(&HEADER, "aabb").unwrap_err();
        assert!(matches!(err, CryptoError::BadFormat(_)));
    }

    proptest::proptest! {
        #[test]
        fn roundtrip_arbitrary_payloads(
            payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..=128)
        ) {
            let ascii = save_bytes_to_checksummed_ascii(&HEADER, &payload);
            let decoded = load_bytes_from_checksummed_ascii(&HEADER, &ascii).unwrap();
            proptest::prop_assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn trim_is_idempotent_and_tolerant() {
        assert_eq!(trim_trailing_whitespace(""), "");
        assert_eq!(trim_trailing_whitespace("abc"), "abc");
        assert_eq!(trim_trailing_whitespace("abc\r\n"), "abc");
        assert_eq!(trim_trailing_whitespace("abc\0\t \n"), "abc");
        // Interior whitespace is untouched.
        assert_eq!(trim_trailing_whitespace("a b\tc\n"), "a b\tc");

        let payload = secure_random(32).unwrap();
        let clean = save_bytes_to_checksummed_ascii(&HEADER, &payload);
        let mut noisy = clean.clone();
        for c in ['\r', '\n', '\t', '\0', ' ', '\n', '\r'] {
            noisy.push(c);
            assert_eq!(trim_trailing_whitespace(&noisy), clean);
        }
        assert_eq!(
            trim_trailing_whitespace(trim_trailing_whitespace(&noisy)),
            clean
        );
    }
}
