//! Legacy NIP-04 payloads: `base64(ciphertext)?iv=base64(iv)`
//!
//! AES-256-CBC keyed directly by the ECDH x coordinate, PKCS#7 padding and
//! no MAC. Decryption only. Whether it is reachable at all is decided by
//! [`LegacyPolicy`](super::LegacyPolicy).

use aes::Aes256;
use base64::{Engine, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::{
    curve::SharedSecret,
    error::{CryptoError, Result},
    secure::SecureBuffer,
};

type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Separator between ciphertext and IV
const IV_SEPARATOR: &str = "?iv=";

/// AES block and IV size
const BLOCK_LEN: usize = 16;

/// Returns true if `payload` uses the legacy `?iv=` framing.
pub fn is_legacy(payload: &str) -> bool {
    payload.contains(IV_SEPARATOR)
}

/// Decrypt a legacy payload.
///
/// Without a MAC, a wrong key or tampered ciphertext is only detected when
/// the PKCS#7 padding fails to strip; that is reported as
/// `AuthenticationFailed`.
pub(crate) fn decrypt(shared: &SharedSecret, payload: &str) -> Result<SecureBuffer> {
    let Some((ciphertext_b64, iv_b64)) = payload.split_once(IV_SEPARATOR) else {
        return Err(CryptoError::malformed_envelope("missing legacy iv separator"));
    };

    let ciphertext = STANDARD
        .decode(ciphertext_b64)
        .map_err(|e| CryptoError::malformed_envelope(format!("legacy ciphertext base64: {e}")))?;
    let iv = STANDARD
        .decode(iv_b64)
        .map_err(|e| CryptoError::malformed_envelope(format!("legacy iv base64: {e}")))?;

    if iv.len() != BLOCK_LEN {
        return Err(CryptoError::malformed_envelope(format!(
            "legacy iv must be {BLOCK_LEN} bytes, got {}",
            iv.len()
        )));
    }
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::malformed_envelope(format!(
            "legacy ciphertext of {} bytes is not a whole number of blocks",
            ciphertext.len()
        )));
    }

    let Ok(cipher) = Aes256CbcDec::new_from_slices(shared.as_bytes(), &iv) else {
        unreachable!("key and iv lengths are fixed");
    };

    let mut buffer = SecureBuffer::from_slice(&ciphertext)?;
    let plaintext = cipher.decrypt_padded_mut::<Pkcs7>(buffer.as_mut_slice()).map_err(|_| {
        tracing::debug!(ciphertext_len = ciphertext.len(), "legacy payload padding mismatch");
        CryptoError::AuthenticationFailed
    })?;

    SecureBuffer::from_slice(plaintext)
}
