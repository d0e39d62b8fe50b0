//! Authenticated message envelope (NIP-44 version 2)
//!
//! # Construction
//!
//! ```text
//! ECDH x ──HKDF-Extract("nip44-v2")──► conversation key
//!                                            │
//!                    HKDF-Expand(info = nonce, 76 bytes)
//!                                            │
//!              ┌─────────────────────────────┼─────────────────┐
//!              ▼                             ▼                 ▼
//!         ChaCha20 key                ChaCha20 nonce       HMAC key
//!              │                             │                 │
//!   pad(plaintext) ──ChaCha20──► ciphertext ──HMAC-SHA256(nonce ‖ ct)──► mac
//! ```
//!
//! The MAC is checked in constant time before anything is decrypted, so
//! forged envelopes never reach the cipher or the padding check.
//!
//! The free functions here are stateless and keyed by a [`ConversationKey`].
//! [`Conversation`] adds the legacy format policy on top.

mod conversation;
mod format;
mod keys;
mod legacy;
mod padding;

pub use conversation::{Conversation, EnvelopeConfig, LegacyPolicy};
pub use format::{Envelope, VERSION};
pub use keys::{ConversationKey, MAC_LEN, MessageKeys, NONCE_LEN};
pub use legacy::is_legacy;
pub use padding::{MAX_PLAINTEXT_LEN, MIN_PLAINTEXT_LEN, calc_padded_len, pad, unpad};
use rand::{RngCore, rngs::OsRng};

use crate::{
    error::{CryptoError, Result},
    secure::SecureBuffer,
};

/// Encrypt `plaintext` under `key` with a caller-chosen nonce.
///
/// Reusing a nonce with the same key reveals the XOR of the two padded
/// plaintexts. Production callers use [`encrypt`].
///
/// # Errors
///
/// - `InvalidArgument`: plaintext is empty or longer than 65535 bytes
/// - `NoMemory`: the padded buffer could not be allocated
pub fn encrypt_with_nonce(
    key: &ConversationKey,
    plaintext: &[u8],
    nonce: &[u8; NONCE_LEN],
) -> Result<String> {
    let keys = MessageKeys::derive(key, nonce);

    let mut buffer = pad(plaintext)?;
    keys.apply_keystream(buffer.as_mut_slice());
    let mac = keys.mac(nonce, buffer.as_slice());

    let envelope = Envelope { nonce: *nonce, ciphertext: buffer.to_vec(), mac };
    Ok(envelope.encode())
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// # Errors
///
/// See [`encrypt_with_nonce`].
pub fn encrypt(key: &ConversationKey, plaintext: &[u8]) -> Result<String> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    encrypt_with_nonce(key, plaintext, &nonce)
}

/// Authenticate and decrypt `payload`, returning the plaintext in a secure
/// buffer.
///
/// # Errors
///
/// - `PolicyRejected`: legacy `?iv=` payload, before any decoding
/// - `UnsupportedVersion`: reserved `#` prefix or unknown version byte
/// - `MalformedEnvelope`: invalid base64 or impossible length
/// - `AuthenticationFailed`: MAC mismatch (wrong key or tampering)
/// - `InvalidPadding`: authenticated but structurally invalid padding
pub fn decrypt_secure(key: &ConversationKey, payload: &str) -> Result<SecureBuffer> {
    // A conversation key alone cannot open legacy payloads.
    if is_legacy(payload) {
        tracing::debug!(payload_len = payload.len(), "legacy payload rejected");
        return Err(CryptoError::PolicyRejected {
            reason: "legacy ?iv= payloads need a conversation with LegacyPolicy::Decrypt"
                .to_owned(),
        });
    }

    let envelope = Envelope::decode(payload)?;
    let keys = MessageKeys::derive(key, &envelope.nonce);

    keys.verify_mac(&envelope.nonce, &envelope.ciphertext, &envelope.mac).inspect_err(|_| {
        tracing::debug!(ciphertext_len = envelope.ciphertext.len(), "envelope mac mismatch");
    })?;

    let mut padded = SecureBuffer::from_slice(&envelope.ciphertext)?;
    keys.apply_keystream(padded.as_mut_slice());

    let plaintext = unpad(padded.as_slice()).inspect_err(|e| {
        tracing::debug!(error = %e, "authenticated envelope has invalid padding");
    })?;
    SecureBuffer::from_slice(plaintext)
}

/// Authenticate and decrypt `payload`.
///
/// # Errors
///
/// See [`decrypt_secure`].
pub fn decrypt(key: &ConversationKey, payload: &str) -> Result<Vec<u8>> {
    Ok(decrypt_secure(key, payload)?.to_vec())
}
