//! Per-operation key derivation from a raw key or a password.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use lockbox_core::{
    CryptoError, Result, AUTHENTICATION_INFO_STRING, ENCRYPTION_INFO_STRING, KEY_BYTE_SIZE,
    SALT_BYTE_SIZE,
};

use crate::key::Key;

/// PBKDF2 iteration count for the password path. Deliberately slow.
pub(crate) const PBKDF2_ITERATIONS: u32 = 100_000;

/// The secret an operation runs under: a raw key, or a password that
/// first goes through deliberate key stretching.
pub(crate) enum KeyOrPassword<'a> {
    Key(&'a Key),
    Password(&'a [u8]),
}

/// One authentication key and one encryption key, derived fresh per
/// operation. Zeroized on drop; never persisted.
pub(crate) struct DerivedKeys {
    pub authentication_key: [u8; KEY_BYTE_SIZE],
    pub encryption_key: [u8; KEY_BYTE_SIZE],
}

impl Drop for DerivedKeys {
    fn drop(&mut self) {
        self.authentication_key.zeroize();
        self.encryption_key.zeroize();
    }
}

impl KeyOrPassword<'_> {
    /// Derives the authentication and encryption keys for one operation.
    ///
    /// Both keys intentionally share the salt; the distinct HKDF info
    /// strings are what separate them.
    pub fn derive_keys(&self, salt: &[u8]) -> Result<DerivedKeys> {
        if salt.len() != SALT_BYTE_SIZE {
            return Err(CryptoError::EnvironmentBroken("bad salt".into()));
        }

        match self {
            KeyOrPassword::Key(key) => Ok(DerivedKeys {
                authentication_key: hkdf_expand(key.raw_bytes(), salt, AUTHENTICATION_INFO_STRING)?,
                encryption_key: hkdf_expand(key.raw_bytes(), salt, ENCRYPTION_INFO_STRING)?,
            }),
            KeyOrPassword::Password(password) => {
                // Pre-hash so an attacker-supplied overlong password cannot
                // turn the PBKDF2 below into a denial of service.
                let prehash = Sha256::digest(password);

                let mut prekey = [0u8; KEY_BYTE_SIZE];
                pbkdf2::pbkdf2_hmac::<Sha256>(&prehash, salt, PBKDF2_ITERATIONS, &mut prekey);

                // Cryptographic re-use of the salt, as on the key path.
                let derived = DerivedKeys {
                    authentication_key: hkdf_expand(&prekey, salt, AUTHENTICATION_INFO_STRING)?,
                    encryption_key: hkdf_expand(&prekey, salt, ENCRYPTION_INFO_STRING)?,
                };
                prekey.zeroize();
                Ok(derived)
            }
        }
    }
}

fn hkdf_expand(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<[u8; KEY_BYTE_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; KEY_BYTE_SIZE];
    hkdf.expand(info, &mut okm)
        .map_err(|e| CryptoError::EnvironmentBroken(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}
