//! One-time runtime sanity check of the cryptographic primitives.
//!
//! Runs known-answer tests for AES-256-CTR and HMAC-SHA256 plus counter
//! arithmetic checks the first time a cipher entry point is used, and
//! memoizes the verdict for the life of the process. A failure means the
//! environment is broken (miscompiled primitives, broken vendor patches)
//! and every subsequent operation keeps failing with the same error.

use std::sync::OnceLock;

use cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use lockbox_core::{constant_time_eq, increment_counter, CryptoError, Result};

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

static ENVIRONMENT_CHECK: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Ensure the runtime self-test has passed. Cheap after the first call.
pub(crate) fn ensure_environment() -> Result<()> {
    ENVIRONMENT_CHECK
        .get_or_init(run_checks)
        .clone()
        .map_err(CryptoError::EnvironmentBroken)
}

fn run_checks() -> std::result::Result<(), String> {
    aes_ctr_known_answer()?;
    hmac_known_answer()?;
    counter_arithmetic()?;
    tracing::debug!("cryptographic runtime self-test passed");
    Ok(())
}

/// NIST SP 800-38A, F.5.5 (AES-256 CTR, first block).
fn aes_ctr_known_answer() -> std::result::Result<(), String> {
    let key = hex_bytes("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")?;
    let iv = hex_bytes("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff")?;
    let plaintext = hex_bytes("6bc1bee22e409f96e93d7e117393172a")?;
    let expected = hex_bytes("601ec313775789a5b7a7f504bbf3d228")?;

    let key: [u8; 32] = key.try_into().map_err(|_| "bad self-test key".to_string())?;
    let iv: [u8; 16] = iv.try_into().map_err(|_| "bad self-test IV".to_string())?;

    let mut block = plaintext.clone();
    Aes256Ctr::new(&key.into(), &iv.into()).apply_keystream(&mut block);
    if block != expected {
        return Err("AES-256-CTR known-answer test failed".into());
    }

    // And back again.
    Aes256Ctr::new(&key.into(), &iv.into()).apply_keystream(&mut block);
    if block != plaintext {
        return Err("AES-256-CTR decryption self-test failed".into());
    }
    Ok(())
}

/// RFC 4231, test case 1.
fn hmac_known_answer() -> std::result::Result<(), String> {
    let expected =
        hex_bytes("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7")?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&[0x0B; 20])
        .map_err(|e| format!("cannot initialize HMAC: {e}"))?;
    mac.update(b"Hi There");
    let digest = mac.finalize().into_bytes();
    if !constant_time_eq(digest.as_slice(), &expected) {
        return Err("HMAC-SHA256 known-answer test failed".into());
    }
    Ok(())
}

fn counter_arithmetic() -> std::result::Result<(), String> {
    let mut one = [0u8; 16];
    one[15] = 1;
    let incremented =
        increment_counter(&[0u8; 16], 1).map_err(|e| format!("counter self-test: {e}"))?;
    if incremented != one {
        return Err("counter increment self-test failed".into());
    }

    let wrapped =
        increment_counter(&[0xFF; 16], 1).map_err(|e| format!("counter self-test: {e}"))?;
    if wrapped != [0u8; 16] {
        return Err("counter wraparound self-test failed".into());
    }
    Ok(())
}

fn hex_bytes(s: &str) -> std::result::Result<Vec<u8>, String> {
    hex::decode(s).map_err(|e| format!("self-test vector is corrupt: {e}"))
}
