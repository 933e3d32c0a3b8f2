//! Secure random byte generation backed by the operating system.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, Result};

/// Return `len` cryptographically secure random bytes.
///
/// Requesting zero bytes is a caller bug (`InvalidInput`); an OS RNG
/// failure is `EnvironmentBroken` and must never be retried.
pub fn secure_random(len: usize) -> Result<Vec<u8>> {
    if len == 0 {
        return Err(CryptoError::InvalidInput(
            "a zero amount of random bytes was requested".into(),
        ));
    }
    let mut buf = vec![0u8; len];
    OsRng.try_fill_bytes(&mut buf).map_err(|e| {
        CryptoError::EnvironmentBroken(format!(
            "the system secure random number generator failed: {e}"
        ))
    })?;
    Ok(buf)
}

/// Fixed-size variant of [`secure_random`] for salts, IVs, and keys.
pub fn secure_random_array<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    if N == 0 {
        return Err(CryptoError::InvalidInput(
            "a zero amount of random bytes was requested".into(),
        ));
    }
    OsRng.try_fill_bytes(&mut buf).map_err(|e| {
        CryptoError::EnvironmentBroken(format!(
            "the system secure random number generator failed: {e}"
        ))
    })?;
    Ok(buf)
}
