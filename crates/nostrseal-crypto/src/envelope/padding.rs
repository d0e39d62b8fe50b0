//! Length-hiding padding
//!
//! Plaintexts are padded to coarse size classes so that ciphertext length
//! reveals only a bucket, not the exact length:
//!
//! - up to 32 bytes: 32
//! - up to 256 bytes: next multiple of 32
//! - beyond: next multiple of one eighth of the next power of two
//!
//! Layout: `len (u16, big-endian) ‖ plaintext ‖ zeros`.

use crate::{
    error::{CryptoError, Result},
    secure::SecureBuffer,
};

/// Shortest plaintext accepted
pub const MIN_PLAINTEXT_LEN: usize = 1;

/// Longest plaintext accepted
pub const MAX_PLAINTEXT_LEN: usize = 65535;

/// Size of the big-endian length prefix
const LENGTH_PREFIX_LEN: usize = 2;

/// Smallest padded size class
const MIN_PADDED_LEN: usize = 32;

/// Padded size (excluding the length prefix) for a plaintext of `len` bytes.
pub fn calc_padded_len(len: usize) -> usize {
    if len <= MIN_PADDED_LEN {
        return MIN_PADDED_LEN;
    }

    // 1 << (floor(log2(len - 1)) + 1)
    let next_power = 1usize << (usize::BITS - (len - 1).leading_zeros());
    let chunk = if next_power <= 256 { 32 } else { next_power / 8 };

    chunk * ((len - 1) / chunk + 1)
}

/// Pad `plaintext` into a fresh secure buffer of `2 + calc_padded_len(len)`
/// bytes.
///
/// # Errors
///
/// - `InvalidArgument`: plaintext is empty or longer than 65535 bytes
pub fn pad(plaintext: &[u8]) -> Result<SecureBuffer> {
    let len = plaintext.len();
    if !(MIN_PLAINTEXT_LEN..=MAX_PLAINTEXT_LEN).contains(&len) {
        return Err(CryptoError::invalid_argument(format!(
            "plaintext must be {MIN_PLAINTEXT_LEN}-{MAX_PLAINTEXT_LEN} bytes, got {len}"
        )));
    }

    let mut buffer = SecureBuffer::acquire(LENGTH_PREFIX_LEN + calc_padded_len(len))?;
    let bytes = buffer.as_mut_slice();
    bytes[..LENGTH_PREFIX_LEN].copy_from_slice(&(len as u16).to_be_bytes());
    bytes[LENGTH_PREFIX_LEN..LENGTH_PREFIX_LEN + len].copy_from_slice(plaintext);

    Ok(buffer)
}

/// Validate a padded buffer and return the plaintext inside it.
///
/// # Errors
///
/// - `InvalidPadding`: zero length prefix, total size that does not match
///   the prefix's size class, or non-zero padding bytes
pub fn unpad(padded: &[u8]) -> Result<&[u8]> {
    if padded.len() < LENGTH_PREFIX_LEN {
        return Err(CryptoError::invalid_padding("missing length prefix"));
    }

    let len = usize::from(u16::from_be_bytes([padded[0], padded[1]]));
    if len < MIN_PLAINTEXT_LEN {
        return Err(CryptoError::invalid_padding("zero plaintext length"));
    }

    let expected = LENGTH_PREFIX_LEN + calc_padded_len(len);
    if padded.len() != expected {
        return Err(CryptoError::invalid_padding(format!(
            "expected {expected} padded bytes, got {}",
            padded.len()
        )));
    }

    let end = LENGTH_PREFIX_LEN + len;
    if padded[end..].iter().any(|&b| b != 0) {
        return Err(CryptoError::invalid_padding("non-zero padding bytes"));
    }

    Ok(&padded[LENGTH_PREFIX_LEN..end])
}
