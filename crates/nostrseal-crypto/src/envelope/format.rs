//! Envelope wire format
//!
//! ```text
//! base64( version (1) ‖ nonce (32) ‖ ciphertext (2 + padded) ‖ mac (32) )
//! ```
//!
//! Standard alphabet with `=` padding and no line breaks.

use base64::{Engine, engine::general_purpose::STANDARD};

use super::{
    keys::{MAC_LEN, NONCE_LEN},
    padding::MAX_PLAINTEXT_LEN,
};
use crate::error::{CryptoError, Result};

/// Envelope format version
pub const VERSION: u8 = 0x02;

/// Leading character reserved for a future, non-base64 encoding
const FUTURE_VERSION_MARKER: char = '#';

/// Version byte plus nonce plus mac
const MIN_DECODED_LEN: usize = 1 + NONCE_LEN + MAC_LEN;

/// Largest decoded envelope: maximum plaintext padded to 65536 bytes
const MAX_DECODED_LEN: usize = 1 + NONCE_LEN + 2 + (MAX_PLAINTEXT_LEN + 1) + MAC_LEN;

/// base64 length of [`MAX_DECODED_LEN`] bytes
const MAX_ENCODED_LEN: usize = MAX_DECODED_LEN.div_ceil(3) * 4;

/// Decoded, not yet authenticated, envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Per-message random nonce
    pub nonce: [u8; NONCE_LEN],
    /// Encrypted padded plaintext
    pub ciphertext: Vec<u8>,
    /// HMAC-SHA256 over `nonce ‖ ciphertext`
    pub mac: [u8; MAC_LEN],
}

impl Envelope {
    /// Split a base64 payload into its fields.
    ///
    /// Only the framing is checked. The MAC is verified by the decrypt path.
    ///
    /// # Errors
    ///
    /// - `UnsupportedVersion`: reserved `#` prefix, or version byte other
    ///   than [`VERSION`]
    /// - `MalformedEnvelope`: invalid base64, or decoded length out of range
    pub fn decode(payload: &str) -> Result<Self> {
        if payload.starts_with(FUTURE_VERSION_MARKER) {
            tracing::debug!("envelope uses reserved non-base64 encoding");
            return Err(CryptoError::UnsupportedVersion { version: FUTURE_VERSION_MARKER as u8 });
        }
        if payload.len() > MAX_ENCODED_LEN {
            return Err(CryptoError::malformed_envelope(format!(
                "payload of {} characters exceeds {MAX_ENCODED_LEN}",
                payload.len()
            )));
        }

        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| CryptoError::malformed_envelope(format!("base64: {e}")))?;
        if bytes.len() < MIN_DECODED_LEN {
            return Err(CryptoError::malformed_envelope(format!(
                "decoded {} bytes, need at least {MIN_DECODED_LEN}",
                bytes.len()
            )));
        }

        if bytes[0] != VERSION {
            tracing::debug!(version = bytes[0], "unsupported envelope version");
            return Err(CryptoError::UnsupportedVersion { version: bytes[0] });
        }

        let mac_start = bytes.len() - MAC_LEN;
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[1..1 + NONCE_LEN]);
        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&bytes[mac_start..]);

        Ok(Self { nonce, ciphertext: bytes[1 + NONCE_LEN..mac_start].to_vec(), mac })
    }

    /// Serialize to the base64 wire form.
    pub fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(MIN_DECODED_LEN + self.ciphertext.len());
        bytes.push(VERSION);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes.extend_from_slice(&self.mac);
        STANDARD.encode(bytes)
    }
}
