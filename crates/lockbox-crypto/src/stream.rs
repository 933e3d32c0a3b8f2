//! Encrypt/decrypt arbitrarily large byte streams with bounded memory.
//!
//! Same wire format as the string cipher, produced and consumed in
//! 1 MiB chunks. CTR counter handling: each chunk is encrypted with the
//! current counter block, then the counter advances by the number of
//! blocks in a full chunk (`BUFFER_BYTE_SIZE / 16`).
//!
//! Decryption is a mandatory two-pass protocol. Pass 1 streams the whole
//! ciphertext through HMAC-SHA256, recording the running digest after
//! each chunk as a checkpoint, and verifies the final digest against the
//! stored MAC. Pass 2 re-reads the ciphertext and re-authenticates every
//! chunk against its pass-1 checkpoint before decrypting it. An attacker
//! who mutates the underlying storage between the passes is caught at
//! the first divergent chunk, before any of its plaintext is emitted.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use lockbox_core::{
    constant_time_eq, increment_counter, secure_random_array, CryptoError, Result,
    BLOCK_BYTE_SIZE, BUFFER_BYTE_SIZE, CURRENT_VERSION, HEADER_VERSION_SIZE, MAC_BYTE_SIZE,
    MINIMUM_CIPHERTEXT_SIZE, SALT_BYTE_SIZE,
};

use crate::cipher::Aes256Ctr;
use crate::kdf::{DerivedKeys, KeyOrPassword};
use crate::key::Key;
use crate::selftest;

type HmacSha256 = Hmac<Sha256>;

/// Blocks the counter advances per full chunk.
const BLOCKS_PER_BUFFER: i64 = (BUFFER_BYTE_SIZE / BLOCK_BYTE_SIZE) as i64;

/// Encrypts everything readable from `input`, writing the ciphertext to
/// `output`.
pub fn encrypt_stream<R: Read, W: Write>(input: &mut R, output: &mut W, key: &Key) -> Result<()> {
    encrypt_stream_internal(input, output, &KeyOrPassword::Key(key))
}

/// Password variant of [`encrypt_stream`]; uses slow key derivation.
pub fn encrypt_stream_with_password<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    password: &SecretString,
) -> Result<()> {
    encrypt_stream_internal(
        input,
        output,
        &KeyOrPassword::Password(password.expose_secret().as_bytes()),
    )
}

/// Decrypts a seekable ciphertext stream into `output` using the
/// two-pass verify-then-decrypt protocol.
pub fn decrypt_stream<R: Read + Seek, W: Write>(
    input: &mut R,
    output: &mut W,
    key: &Key,
) -> Result<()> {
    decrypt_stream_internal(input, output, &KeyOrPassword::Key(key))
}

/// Password variant of [`decrypt_stream`].
pub fn decrypt_stream_with_password<R: Read + Seek, W: Write>(
    input: &mut R,
    output: &mut W,
    password: &SecretString,
) -> Result<()> {
    decrypt_stream_internal(
        input,
        output,
        &KeyOrPassword::Password(password.expose_secret().as_bytes()),
    )
}

/// Encrypts the input file, saving the ciphertext to the output file.
pub fn encrypt_file(input: &Path, output: &Path, key: &Key) -> Result<()> {
    let (mut inf, mut outf) = open_distinct_files(input, output)?;
    encrypt_stream(&mut inf, &mut outf, key)
}

/// Decrypts the input file, saving the plaintext to the output file.
pub fn decrypt_file(input: &Path, output: &Path, key: &Key) -> Result<()> {
    let (mut inf, mut outf) = open_distinct_files(input, output)?;
    decrypt_stream(&mut inf, &mut outf, key)
}

/// Password variant of [`encrypt_file`].
pub fn encrypt_file_with_password(
    input: &Path,
    output: &Path,
    password: &SecretString,
) -> Result<()> {
    let (mut inf, mut outf) = open_distinct_files(input, output)?;
    encrypt_stream_with_password(&mut inf, &mut outf, password)
}

/// Password variant of [`decrypt_file`].
pub fn decrypt_file_with_password(
    input: &Path,
    output: &Path,
    password: &SecretString,
) -> Result<()> {
    let (mut inf, mut outf) = open_distinct_files(input, output)?;
    decrypt_stream_with_password(&mut inf, &mut outf, password)
}

/// Opens the input/output pair, rejecting paths that resolve to the same
/// underlying file. Writing a file onto itself while reading it would
/// corrupt it before the integrity checks could run.
fn open_distinct_files(input: &Path, output: &Path) -> Result<(fs::File, fs::File)> {
    if input.exists() && output.exists() && fs::canonicalize(input)? == fs::canonicalize(output)? {
        return Err(CryptoError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "input and output files must be different",
        )));
    }
    let inf = fs::File::open(input)?;
    let outf = fs::File::create(output)?;
    Ok((inf, outf))
}

fn encrypt_stream_internal<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    secret: &KeyOrPassword<'_>,
) -> Result<()> {
    selftest::ensure_environment()?;

    let salt: [u8; SALT_BYTE_SIZE] = secure_random_array()?;
    let keys = secret.derive_keys(&salt)?;
    let iv: [u8; BLOCK_BYTE_SIZE] = secure_random_array()?;

    let mut hmac = new_hmac(&keys)?;
    output.write_all(&CURRENT_VERSION)?;
    output.write_all(&salt)?;
    output.write_all(&iv)?;
    hmac.update(&CURRENT_VERSION);
    hmac.update(&salt);
    hmac.update(&iv);

    let mut counter = iv;
    let mut buf = vec![0u8; BUFFER_BYTE_SIZE];
    let mut total: u64 = 0;
    let mut chunks: u64 = 0;

    loop {
        let n = read_full(input, &mut buf)?;
        if n == 0 {
            break;
        }
        let chunk = &mut buf[..n];
        Aes256Ctr::new(&keys.encryption_key.into(), &counter.into()).apply_keystream(chunk);
        output.write_all(chunk)?;
        hmac.update(chunk);
        total += n as u64;
        chunks += 1;

        if n < BUFFER_BYTE_SIZE {
            break;
        }
        counter = increment_counter(&counter, BLOCKS_PER_BUFFER)?;
    }

    let mac = hmac.finalize().into_bytes();
    output.write_all(&mac)?;
    output.flush()?;

    tracing::debug!(bytes = total, chunks, "stream encrypted");
    Ok(())
}

fn decrypt_stream_internal<R: Read + Seek, W: Write>(
    input: &mut R,
    output: &mut W,
    secret: &KeyOrPassword<'_>,
) -> Result<()> {
    selftest::ensure_environment()?;

    // The stream must be big enough for all the reads below.
    let total = input.seek(SeekFrom::End(0))?;
    if total < MINIMUM_CIPHERTEXT_SIZE as u64 {
        return Err(CryptoError::WrongKeyOrModifiedCiphertext(
            "input is too short to have been created by this library".into(),
        ));
    }

    input.seek(SeekFrom::Start(0))?;
    let mut header = [0u8; HEADER_VERSION_SIZE];
    input.read_exact(&mut header)?;
    if header != CURRENT_VERSION {
        return Err(CryptoError::WrongKeyOrModifiedCiphertext(
            "bad version header".into(),
        ));
    }

    let mut salt = [0u8; SALT_BYTE_SIZE];
    input.read_exact(&mut salt)?;
    let mut iv = [0u8; BLOCK_BYTE_SIZE];
    input.read_exact(&mut iv)?;

    let keys = secret.derive_keys(&salt)?;

    let ciphertext_start = (HEADER_VERSION_SIZE + SALT_BYTE_SIZE + BLOCK_BYTE_SIZE) as u64;
    let ciphertext_len = total - ciphertext_start - MAC_BYTE_SIZE as u64;

    input.seek(SeekFrom::Start(total - MAC_BYTE_SIZE as u64))?;
    let mut stored_mac = [0u8; MAC_BYTE_SIZE];
    input.read_exact(&mut stored_mac)?;

    // PASS 1: authenticate the whole stream, remembering the running
    // digest after every chunk.
    let mut hmac = new_hmac(&keys)?;
    hmac.update(&header);
    hmac.update(&salt);
    hmac.update(&iv);
    // Second context for pass 2, forked before any ciphertext is mixed in.
    let mut hmac2 = hmac.clone();

    let mut checkpoints: Vec<[u8; MAC_BYTE_SIZE]> = Vec::new();
    let mut buf = vec![0u8; BUFFER_BYTE_SIZE];

    input.seek(SeekFrom::Start(ciphertext_start))?;
    let mut remaining = ciphertext_len;
    while remaining > 0 {
        let n = remaining.min(BUFFER_BYTE_SIZE as u64) as usize;
        input.read_exact(&mut buf[..n])?;
        hmac.update(&buf[..n]);
        checkpoints.push(hmac.clone().finalize().into_bytes().into());
        remaining -= n as u64;
    }

    let final_mac: [u8; MAC_BYTE_SIZE] = hmac.finalize().into_bytes().into();
    if !constant_time_eq(&final_mac, &stored_mac) {
        return Err(CryptoError::WrongKeyOrModifiedCiphertext(
            "integrity check failed".into(),
        ));
    }

    // PASS 2: re-read, re-authenticate each chunk against its pass-1
    // checkpoint, and only then decrypt and emit it.
    input.seek(SeekFrom::Start(ciphertext_start))?;
    let mut checkpoints = checkpoints.into_iter();
    let mut counter = iv;
    let mut remaining = ciphertext_len;
    let mut chunks: u64 = 0;

    while remaining > 0 {
        let n = remaining.min(BUFFER_BYTE_SIZE as u64) as usize;
        input.read_exact(&mut buf[..n])?;

        hmac2.update(&buf[..n]);
        let calculated: [u8; MAC_BYTE_SIZE] = hmac2.clone().finalize().into_bytes().into();
        let expected = checkpoints.next().ok_or_else(modified_after_verification)?;
        if !constant_time_eq(&calculated, &expected) {
            return Err(modified_after_verification());
        }

        let chunk = &mut buf[..n];
        Aes256Ctr::new(&keys.encryption_key.into(), &counter.into()).apply_keystream(chunk);
        output.write_all(chunk)?;
        chunks += 1;

        remaining -= n as u64;
        if remaining > 0 {
            counter = increment_counter(&counter, BLOCKS_PER_BUFFER)?;
        }
    }
    output.flush()?;

    tracing::debug!(bytes = ciphertext_len, chunks, "stream decrypted");
    Ok(())
}

fn modified_after_verification() -> CryptoError {
    CryptoError::WrongKeyOrModifiedCiphertext("file was modified after MAC verification".into())
}

fn new_hmac(keys: &DerivedKeys) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(&keys.authentication_key)
        .map_err(|e| CryptoError::EnvironmentBroken(format!("cannot initialize HMAC: {e}")))
}

/// Read until the buffer is full or the stream hits EOF; returns the
/// number of bytes read. Never returns a partially-filled buffer unless
/// EOF was reached.
fn read_full<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
