//! lockbox-crypto: authenticated symmetric encryption for payloads and streams
//!
//! Architecture: Encrypt-then-MAC over AES-256-CTR with HMAC-SHA256
//!
//! Key hierarchy (fresh per operation, never persisted):
//! ```text
//! Key (256-bit random)  ──HKDF-SHA256──┬── authentication key (info="lockbox|KeyForAuthentication")
//!                                      └── encryption key     (info="lockbox|KeyForEncryption")
//!
//! Password ──SHA-256──PBKDF2(100k)──── prekey ──HKDF-SHA256── same two keys
//! ```
//!
//! Both derivations share one random 32-byte salt; the distinct HKDF info
//! strings are what separate the two keys cryptographically.
//!
//! Two entry surfaces:
//! - [`cipher`]: whole in-memory byte strings, optionally hex-armored.
//! - [`stream`]: unbounded seekable streams with O(1 MiB) memory and a
//!   mandatory two-pass verify-then-decrypt protocol.

pub mod cipher;
pub mod key;
pub mod protected;
pub mod stream;

mod kdf;
mod selftest;

pub use cipher::{
    decrypt, decrypt_raw, decrypt_raw_with_password, decrypt_with_password, encrypt, encrypt_raw,
    encrypt_raw_with_password, encrypt_with_password,
};
pub use key::Key;
pub use lockbox_core::{CryptoError, Result};
pub use protected::KeyProtectedByPassword;
pub use stream::{
    decrypt_file, decrypt_file_with_password, decrypt_stream, decrypt_stream_with_password,
    encrypt_file, encrypt_file_with_password, encrypt_stream, encrypt_stream_with_password,
};
