//! Big-endian counter arithmetic for CTR mode.

use crate::error::{CryptoError, Result};
use crate::BLOCK_BYTE_SIZE;

/// Add `inc` to a block-sized big-endian counter, starting at the
/// rightmost byte and propagating carries leftward.
///
/// Wraparound of the full 128-bit counter is allowed (that is CTR-mode
/// semantics); what is guarded is the intermediate signed arithmetic used
/// to add a byte plus carry, which must never overflow the host integer.
/// The increment is signed so that a nonpositive amount is representable
/// and rejected: incrementing by zero would re-use CTR keystream.
pub fn increment_counter(ctr: &[u8], inc: i64) -> Result<[u8; BLOCK_BYTE_SIZE]> {
    if ctr.len() != BLOCK_BYTE_SIZE {
        return Err(CryptoError::EnvironmentBroken(
            "trying to increment a nonce of the wrong size".into(),
        ));
    }
    if inc <= 0 {
        return Err(CryptoError::EnvironmentBroken(
            "trying to increment a nonce by a nonpositive amount".into(),
        ));
    }
    if inc > i64::MAX - 255 {
        return Err(CryptoError::EnvironmentBroken(
            "integer overflow may occur".into(),
        ));
    }

    let mut out = [0u8; BLOCK_BYTE_SIZE];
    out.copy_from_slice(ctr);

    let mut carry = inc;
    for byte in out.iter_mut().rev() {
        let sum = i64::from(*byte).checked_add(carry).ok_or_else(|| {
            CryptoError::EnvironmentBroken("integer overflow in CTR mode nonce increment".into())
        })?;
        *byte = (sum & 0xFF) as u8;
        carry = sum >> 8;
    }

    Ok(out)
}
