//! A key wrapped (encrypted) under a password.
//!
//! Lets a deployment rotate the password without re-encrypting the data:
//! the inner key stays the same, only its wrapping changes. A value
//! type — changing the password returns a new value rather than mutating
//! in place, so a shared instance can never be silently rewritten.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use lockbox_core::encoding::{
    load_bytes_from_checksummed_ascii, save_bytes_to_checksummed_ascii, trim_trailing_whitespace,
};
use lockbox_core::{CryptoError, Result};

use crate::cipher;
use crate::kdf::KeyOrPassword;
use crate::key::Key;

/// Header constant for the checksummed ASCII encoding of a
/// password-protected key
pub const PASSWORD_KEY_CURRENT_VERSION: [u8; 4] = [0xDE, 0xF1, 0x00, 0x00];

/// A random key encrypted under a password-derived secret.
#[derive(Clone)]
pub struct KeyProtectedByPassword {
    encrypted_key: Vec<u8>,
}

impl KeyProtectedByPassword {
    /// Creates a fresh random key protected by `password`.
    pub fn new_random(password: &SecretString) -> Result<Self> {
        let inner = Key::new_random()?;
        Self::wrap(&inner, password)
    }

    /// Decrypts the protected key, returning the inner [`Key`].
    ///
    /// A wrong password and a tampered wrapping are indistinguishable
    /// here: both fail with the integrity error. In particular, if the
    /// ciphertext was swapped for another one encrypted under the same
    /// password, the decrypted bytes fail key decoding — that inner
    /// format error is deliberately re-signaled as an integrity failure
    /// rather than a format one.
    pub fn unlock(&self, password: &SecretString) -> Result<Key> {
        let encoded = Zeroizing::new(cipher::decrypt_internal(
            &self.encrypted_key,
            &KeyOrPassword::Password(&domain_separated(password)),
        )?);
        let encoded_str = std::str::from_utf8(&encoded)
            .map_err(|_| invalid_inner_key())?;
        match Key::from_ascii_safe(encoded_str) {
            Ok(key) => Ok(key),
            Err(CryptoError::BadFormat(_)) => Err(invalid_inner_key()),
            Err(other) => Err(other),
        }
    }

    /// Re-wraps the inner key under a new password. Consumes the old
    /// value; the inner key bytes are unchanged.
    pub fn change_password(
        self,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<Self> {
        let inner = self.unlock(current_password)?;
        Self::wrap(&inner, new_password)
    }

    /// Loads a protected key from its checksummed ASCII encoding.
    /// Trailing newline noise from file storage is tolerated.
    pub fn from_ascii_safe(saved: &str) -> Result<Self> {
        let trimmed = trim_trailing_whitespace(saved);
        let encrypted_key =
            load_bytes_from_checksummed_ascii(&PASSWORD_KEY_CURRENT_VERSION, trimmed)?;
        Ok(Self { encrypted_key })
    }

    /// Encodes the protected key as printable ASCII.
    pub fn to_ascii_safe(&self) -> String {
        save_bytes_to_checksummed_ascii(&PASSWORD_KEY_CURRENT_VERSION, &self.encrypted_key)
    }

    fn wrap(inner: &Key, password: &SecretString) -> Result<Self> {
        let encoded = Zeroizing::new(inner.to_ascii_safe());
        let encrypted_key = cipher::encrypt_internal(
            encoded.as_bytes(),
            &KeyOrPassword::Password(&domain_separated(password)),
        )?;
        Ok(Self { encrypted_key })
    }
}

/// Hash the password before use, separating this protocol from any other
/// use the caller makes of the same password.
fn domain_separated(password: &SecretString) -> [u8; 32] {
    Sha256::digest(password.expose_secret().as_bytes()).into()
}

fn invalid_inner_key() -> CryptoError {
    CryptoError::WrongKeyOrModifiedCiphertext(
        "the decrypted key was found to be in an invalid format; \
         this very likely indicates it was modified by an attacker"
            .into(),
    )
}

impl std::fmt::Debug for KeyProtectedByPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProtectedByPassword")
            .field("encrypted_key", &"[ciphertext]")
            .finish()
    }
}
