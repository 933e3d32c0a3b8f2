//! Encrypt/decrypt a complete in-memory byte string.
//!
//! Wire format (bit-exact across implementations):
//! ```text
//! offset 0   : VERSION     4 bytes  (DE F5 02 00)
//! offset 4   : SALT       32 bytes
//! offset 36  : IV         16 bytes
//! offset 52  : CIPHERTEXT  n bytes  (= plaintext length, may be 0)
//! offset 52+n: MAC        32 bytes  (HMAC-SHA256 over bytes [0, 52+n))
//! ```
//! Decryption is strictly verify-then-decrypt: the MAC is checked in
//! constant time before a single byte of ciphertext is touched.

use cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use lockbox_core::{
    checked_slice, constant_time_eq, secure_random_array, CryptoError, Result, BLOCK_BYTE_SIZE,
    CURRENT_VERSION, HEADER_VERSION_SIZE, KEY_BYTE_SIZE, MAC_BYTE_SIZE, MINIMUM_CIPHERTEXT_SIZE,
    SALT_BYTE_SIZE,
};

use crate::kdf::KeyOrPassword;
use crate::key::Key;
use crate::selftest;

pub(crate) type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// Encrypts a byte string with a key, returning hex-encoded ciphertext.
pub fn encrypt(plaintext: &[u8], key: &Key) -> Result<String> {
    Ok(hex::encode(encrypt_raw(plaintext, key)?))
}

/// Encrypts a byte string with a key, returning raw binary ciphertext.
pub fn encrypt_raw(plaintext: &[u8], key: &Key) -> Result<Vec<u8>> {
    encrypt_internal(plaintext, &KeyOrPassword::Key(key))
}

/// Encrypts a byte string with a password, using a slow key derivation
/// function to make password cracking more expensive.
pub fn encrypt_with_password(plaintext: &[u8], password: &SecretString) -> Result<String> {
    Ok(hex::encode(encrypt_raw_with_password(plaintext, password)?))
}

/// Raw-binary variant of [`encrypt_with_password`].
pub fn encrypt_raw_with_password(plaintext: &[u8], password: &SecretString) -> Result<Vec<u8>> {
    encrypt_internal(
        plaintext,
        &KeyOrPassword::Password(password.expose_secret().as_bytes()),
    )
}

/// Decrypts hex-encoded ciphertext with a key.
pub fn decrypt(ciphertext: &str, key: &Key) -> Result<Vec<u8>> {
    decrypt_raw(&decode_hex_ciphertext(ciphertext)?, key)
}

/// Decrypts raw binary ciphertext with a key.
pub fn decrypt_raw(ciphertext: &[u8], key: &Key) -> Result<Vec<u8>> {
    decrypt_internal(ciphertext, &KeyOrPassword::Key(key))
}

/// Decrypts hex-encoded ciphertext with a password.
pub fn decrypt_with_password(ciphertext: &str, password: &SecretString) -> Result<Vec<u8>> {
    decrypt_raw_with_password(&decode_hex_ciphertext(ciphertext)?, password)
}

/// Raw-binary variant of [`decrypt_with_password`].
pub fn decrypt_raw_with_password(ciphertext: &[u8], password: &SecretString) -> Result<Vec<u8>> {
    decrypt_internal(
        ciphertext,
        &KeyOrPassword::Password(password.expose_secret().as_bytes()),
    )
}

fn decode_hex_ciphertext(ciphertext: &str) -> Result<Vec<u8>> {
    hex::decode(ciphertext).map_err(|_| {
        CryptoError::WrongKeyOrModifiedCiphertext("ciphertext has invalid hex encoding".into())
    })
}

pub(crate) fn encrypt_internal(plaintext: &[u8], secret: &KeyOrPassword<'_>) -> Result<Vec<u8>> {
    selftest::ensure_environment()?;

    let salt: [u8; SALT_BYTE_SIZE] = secure_random_array()?;
    let keys = secret.derive_keys(&salt)?;
    let iv: [u8; BLOCK_BYTE_SIZE] = secure_random_array()?;

    let mut out = Vec::with_capacity(MINIMUM_CIPHERTEXT_SIZE + plaintext.len());
    out.extend_from_slice(&CURRENT_VERSION);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&iv);

    let mut body = plaintext.to_vec();
    Aes256Ctr::new(&keys.encryption_key.into(), &iv.into()).apply_keystream(&mut body);
    out.append(&mut body);

    let mac = hmac_sha256(&keys.authentication_key, &out)?;
    out.extend_from_slice(&mac);
    Ok(out)
}

pub(crate) fn decrypt_internal(ciphertext: &[u8], secret: &KeyOrPassword<'_>) -> Result<Vec<u8>> {
    selftest::ensure_environment()?;

    // Fail fast, before any key derivation.
    if ciphertext.len() < MINIMUM_CIPHERTEXT_SIZE {
        return Err(CryptoError::WrongKeyOrModifiedCiphertext(
            "ciphertext is too short".into(),
        ));
    }

    let header = checked_slice(ciphertext, 0, HEADER_VERSION_SIZE)
        .ok_or_else(|| CryptoError::EnvironmentBroken("ciphertext header slice failed".into()))?;
    if header != CURRENT_VERSION.as_slice() {
        // A mismatched magic is a hard failure, never a legacy fallback.
        return Err(CryptoError::WrongKeyOrModifiedCiphertext(
            "bad version header".into(),
        ));
    }

    let salt = checked_slice(ciphertext, HEADER_VERSION_SIZE, SALT_BYTE_SIZE)
        .ok_or_else(|| CryptoError::EnvironmentBroken("ciphertext salt slice failed".into()))?;
    let iv = checked_slice(
        ciphertext,
        HEADER_VERSION_SIZE + SALT_BYTE_SIZE,
        BLOCK_BYTE_SIZE,
    )
    .ok_or_else(|| CryptoError::EnvironmentBroken("ciphertext IV slice failed".into()))?;

    let body_len = ciphertext.len() - MINIMUM_CIPHERTEXT_SIZE;
    let body_start = HEADER_VERSION_SIZE + SALT_BYTE_SIZE + BLOCK_BYTE_SIZE;
    let body = checked_slice(ciphertext, body_start, body_len)
        .ok_or_else(|| CryptoError::EnvironmentBroken("ciphertext body slice failed".into()))?;
    let stored_mac = checked_slice(ciphertext, ciphertext.len() - MAC_BYTE_SIZE, MAC_BYTE_SIZE)
        .ok_or_else(|| CryptoError::EnvironmentBroken("ciphertext MAC slice failed".into()))?;

    let keys = secret.derive_keys(salt)?;

    let expected_mac = hmac_sha256(
        &keys.authentication_key,
        &ciphertext[..ciphertext.len() - MAC_BYTE_SIZE],
    )?;
    if !constant_time_eq(&expected_mac, stored_mac) {
        return Err(CryptoError::WrongKeyOrModifiedCiphertext(
            "integrity check failed".into(),
        ));
    }

    // Only decrypt once the MAC has verified.
    let iv: [u8; BLOCK_BYTE_SIZE] = iv
        .try_into()
        .map_err(|_| CryptoError::EnvironmentBroken("ciphertext IV slice failed".into()))?;
    let mut plaintext = body.to_vec();
    Aes256Ctr::new(&keys.encryption_key.into(), &iv.into()).apply_keystream(&mut plaintext);
    Ok(plaintext)
}

pub(crate) fn hmac_sha256(key: &[u8; KEY_BYTE_SIZE], message: &[u8]) -> Result<[u8; MAC_BYTE_SIZE]> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| CryptoError::EnvironmentBroken(format!("cannot initialize HMAC: {e}")))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_core::KEY_BYTE_SIZE;

    fn test_key() -> Key {
        Key::from_raw_bytes([0x42; KEY_BYTE_SIZE])
    }

    #[test]
    fn hex_and_raw_agree() {
        let key = test_key();
        let hex_ct = encrypt(b"attack at dawn", &key).unwrap();
        let raw = hex::decode(&hex_ct).unwrap();
        assert_eq!(decrypt_raw(&raw, &key).unwrap(), b"attack at dawn");
        assert_eq!(decrypt(&hex_ct, &key).unwrap(), b"attack at dawn");
    }

    #[test]
    fn ciphertext_layout() {
        let key = test_key();
        let plaintext = b"0123456789";
        let ct = encrypt_raw(plaintext, &key).unwrap();
        assert_eq!(ct.len(), MINIMUM_CIPHERTEXT_SIZE + plaintext.len());
        assert_eq!(&ct[..4], &CURRENT_VERSION);
    }

    #[test]
    fn empty_plaintext_is_valid() {
        let key = test_key();
        let ct = encrypt_raw(b"", &key).unwrap();
        assert_eq!(ct.len(), MINIMUM_CIPHERTEXT_SIZE);
        assert_eq!(decrypt_raw(&ct, &key).unwrap(), b"");
    }

    #[test]
    fn fresh_salt_and_iv_every_call() {
        let key = test_key();
        let a = encrypt_raw(b"same plaintext", &key).unwrap();
        let b = encrypt_raw(b"same plaintext", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_hex_is_an_integrity_failure() {
        let key = test_key();
        let err = decrypt("this is not hex!", &key).unwrap_err();
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn short_input_fails_fast() {
        let key = test_key();
        for len in [0usize, 1, 50, MINIMUM_CIPHERTEXT_SIZE - 1] {
            let err = decrypt_raw(&vec![0u8; len], &key).unwrap_err();
            assert!(err.is_integrity_failure(), "len {len}");
        }
    }

    #[test]
    fn unknown_version_is_rejected() {
        let key = test_key();
        let mut ct = encrypt_raw(b"payload", &key).unwrap();
        ct[1] = 0xF4; // v1-style header byte
        let err = decrypt_raw(&ct, &key).unwrap_err();
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn password_roundtrip() {
        let password = SecretString::from("correct horse battery staple");
        let ct = encrypt_with_password(b"secret message", &password).unwrap();
        assert_eq!(
            decrypt_with_password(&ct, &password).unwrap(),
            b"secret message"
        );

        let wrong = SecretString::from("incorrect horse battery staple");
        let err = decrypt_with_password(&ct, &wrong).unwrap_err();
        assert!(err.is_integrity_failure());
    }
}
