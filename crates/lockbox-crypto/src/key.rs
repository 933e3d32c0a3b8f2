//! The 256-bit symmetric key and its checksummed ASCII encoding.

use zeroize::Zeroize;

use lockbox_core::encoding::{
    load_bytes_from_checksummed_ascii, save_bytes_to_checksummed_ascii, trim_trailing_whitespace,
};
use lockbox_core::{secure_random_array, CryptoError, Result, KEY_BYTE_SIZE};

/// Header constant for the checksummed ASCII key encoding
pub const KEY_CURRENT_VERSION: [u8; 4] = [0xDE, 0xF0, 0x00, 0x00];

/// A 256-bit symmetric key. Immutable after construction, zeroized on drop.
///
/// Cloning copies the secret bytes by value; there is no shared aliasing.
#[derive(Clone)]
pub struct Key {
    bytes: [u8; KEY_BYTE_SIZE],
}

impl Key {
    /// Creates a new key from the OS secure random number generator.
    pub fn new_random() -> Result<Self> {
        Ok(Self {
            bytes: secure_random_array()?,
        })
    }

    /// Constructs a key from raw bytes. The fixed-size parameter makes a
    /// wrong-length key unrepresentable.
    pub fn from_raw_bytes(bytes: [u8; KEY_BYTE_SIZE]) -> Self {
        Self { bytes }
    }

    /// Loads a key from its checksummed ASCII encoding.
    ///
    /// Trailing CR/LF/TAB/NUL/SPACE are stripped first, so keys that were
    /// saved through a text editor still load.
    pub fn from_ascii_safe(saved: &str) -> Result<Self> {
        let trimmed = trim_trailing_whitespace(saved);
        let mut payload = load_bytes_from_checksummed_ascii(&KEY_CURRENT_VERSION, trimmed)?;
        let bytes: std::result::Result<[u8; KEY_BYTE_SIZE], _> = payload.as_slice().try_into();
        payload.zeroize();
        let bytes =
            bytes.map_err(|_| CryptoError::EnvironmentBroken("bad key length".into()))?;
        Ok(Self { bytes })
    }

    /// Encodes the key as a string of printable ASCII characters.
    pub fn to_ascii_safe(&self) -> String {
        save_bytes_to_checksummed_ascii(&KEY_CURRENT_VERSION, &self.bytes)
    }

    /// The raw secret bytes. Handle with care; never log.
    pub fn raw_bytes(&self) -> &[u8; KEY_BYTE_SIZE] {
        &self.bytes
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key").field("bytes", &"[REDACTED]").finish()
    }
}
