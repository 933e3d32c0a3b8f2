//! lockbox-core: shared primitives for the lockbox encryption library
//!
//! This crate holds the pieces everything else builds on: the error
//! taxonomy, big-endian counter arithmetic for CTR mode, secure random
//! byte generation, constant-time comparison, and the checksummed
//! ASCII-safe encoding used to persist keys as text.
//!
//! Ciphertext wire format (v2, bit-exact):
//! ```text
//! VERSION (4 bytes) || SALT (32 bytes) || IV (16 bytes) ||
//! CIPHERTEXT (varies) || HMAC-SHA256 (32 bytes)
//! ```

pub mod bytes;
pub mod counter;
pub mod encoding;
pub mod error;
pub mod rng;

pub use bytes::{checked_slice, constant_time_eq};
pub use counter::increment_counter;
pub use error::{CryptoError, Result};
pub use rng::{secure_random, secure_random_array};

/// Size of the ciphertext version header in bytes
pub const HEADER_VERSION_SIZE: usize = 4;

/// Magic bytes identifying the current ciphertext format revision
pub const CURRENT_VERSION: [u8; HEADER_VERSION_SIZE] = [0xDE, 0xF5, 0x02, 0x00];

/// AES block size (128-bit)
pub const BLOCK_BYTE_SIZE: usize = 16;

/// Size of a symmetric key (256-bit)
pub const KEY_BYTE_SIZE: usize = 32;

/// Size of the random salt fed into key derivation
pub const SALT_BYTE_SIZE: usize = 32;

/// Size of the HMAC-SHA256 authentication tag
pub const MAC_BYTE_SIZE: usize = 32;

/// Smallest well-formed ciphertext: header + salt + IV + empty body + MAC
pub const MINIMUM_CIPHERTEXT_SIZE: usize =
    HEADER_VERSION_SIZE + SALT_BYTE_SIZE + BLOCK_BYTE_SIZE + MAC_BYTE_SIZE;

/// Chunk size for streaming encryption/decryption (1 MiB)
pub const BUFFER_BYTE_SIZE: usize = 1_048_576;

/// HKDF info string separating the encryption key from the authentication key
pub const ENCRYPTION_INFO_STRING: &[u8] = b"lockbox|KeyForEncryption";

/// HKDF info string separating the authentication key from the encryption key
pub const AUTHENTICATION_INFO_STRING: &[u8] = b"lockbox|KeyForAuthentication";
