//! ncryptsec payload layout
//!
//! ```text
//! version (1) ‖ log_n (1) ‖ salt (16) ‖ nonce (24) ‖ security (1) ‖ ciphertext + tag (48)
//! ```
//!
//! bech32-encoded (classic checksum) under the human-readable part
//! `ncryptsec`.

use bech32::{FromBase32, ToBase32, Variant};

use crate::error::{CryptoError, Result};

/// Payload format version
pub const VERSION: u8 = 0x02;

/// Fixed payload length in bytes
pub const PAYLOAD_LEN: usize = 91;

/// bech32 human-readable part
pub const HRP: &str = "ncryptsec";

/// scrypt salt length
pub const SALT_LEN: usize = 16;

/// XChaCha20-Poly1305 nonce length
pub const NONCE_LEN: usize = 24;

/// Encrypted 32-byte secret plus 16-byte Poly1305 tag
pub const SEALED_LEN: usize = 48;

const LOG_N_OFFSET: usize = 1;
const SALT_OFFSET: usize = 2;
const NONCE_OFFSET: usize = SALT_OFFSET + SALT_LEN;
const SECURITY_OFFSET: usize = NONCE_OFFSET + NONCE_LEN;
const SEALED_OFFSET: usize = SECURITY_OFFSET + 1;

/// How the key was handled before it was encrypted.
///
/// Bound into the ciphertext as associated data, so it cannot be altered
/// without failing authentication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KeySecurity {
    /// Key is known to have been handled insecurely (stored unencrypted,
    /// pasted in plain text)
    KnownInsecure,
    /// Key is not known to have been handled insecurely
    NotKnownInsecure,
    /// Client does not track this
    #[default]
    Unknown,
}

impl KeySecurity {
    /// Wire byte.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::KnownInsecure => 0x00,
            Self::NotKnownInsecure => 0x01,
            Self::Unknown => 0x02,
        }
    }

    /// Parse a wire byte. Values above 0x02 are not assigned.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::KnownInsecure),
            0x01 => Some(Self::NotKnownInsecure),
            0x02 => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl TryFrom<u8> for KeySecurity {
    type Error = CryptoError;

    fn try_from(byte: u8) -> Result<Self> {
        Self::from_byte(byte).ok_or_else(|| {
            CryptoError::malformed_payload(format!("unknown key security byte {byte:#04x}"))
        })
    }
}

/// Parsed key-encryption payload. Carries no plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEncryptionPayload {
    log_n: u8,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    security: KeySecurity,
    sealed: [u8; SEALED_LEN],
}

impl KeyEncryptionPayload {
    /// Assemble a payload from its fields.
    pub fn new(
        log_n: u8,
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        security: KeySecurity,
        sealed: [u8; SEALED_LEN],
    ) -> Self {
        Self { log_n, salt, nonce, security, sealed }
    }

    /// scrypt cost exponent (`N = 2^log_n`).
    pub fn log_n(&self) -> u8 {
        self.log_n
    }

    /// scrypt salt.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// AEAD nonce.
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Key security flag.
    pub fn security(&self) -> KeySecurity {
        self.security
    }

    /// Ciphertext followed by the Poly1305 tag.
    pub fn sealed(&self) -> &[u8; SEALED_LEN] {
        &self.sealed
    }

    /// Serialize to the fixed 91-byte layout.
    pub fn to_bytes(&self) -> [u8; PAYLOAD_LEN] {
        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes[0] = VERSION;
        bytes[LOG_N_OFFSET] = self.log_n;
        bytes[SALT_OFFSET..NONCE_OFFSET].copy_from_slice(&self.salt);
        bytes[NONCE_OFFSET..SECURITY_OFFSET].copy_from_slice(&self.nonce);
        bytes[SECURITY_OFFSET] = self.security.to_byte();
        bytes[SEALED_OFFSET..].copy_from_slice(&self.sealed);
        bytes
    }

    /// Parse the 91-byte layout.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload`: wrong length or unassigned security byte
    /// - `UnsupportedVersion`: version byte other than [`VERSION`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAYLOAD_LEN {
            return Err(CryptoError::malformed_payload(format!(
                "expected {PAYLOAD_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != VERSION {
            tracing::debug!(version = bytes[0], "unsupported ncryptsec version");
            return Err(CryptoError::UnsupportedVersion { version: bytes[0] });
        }

        let security = KeySecurity::try_from(bytes[SECURITY_OFFSET])?;

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&bytes[SALT_OFFSET..NONCE_OFFSET]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[NONCE_OFFSET..SECURITY_OFFSET]);
        let mut sealed = [0u8; SEALED_LEN];
        sealed.copy_from_slice(&bytes[SEALED_OFFSET..]);

        Ok(Self { log_n: bytes[LOG_N_OFFSET], salt, nonce, security, sealed })
    }

    /// Encode as an `ncryptsec1…` string.
    pub fn to_bech32(&self) -> String {
        let Ok(encoded) = bech32::encode(HRP, self.to_bytes().to_base32(), Variant::Bech32) else {
            unreachable!("the ncryptsec prefix is a valid human-readable part");
        };
        encoded
    }

    /// Decode an `ncryptsec1…` string.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload`: bad checksum, wrong prefix, bech32m checksum,
    ///   or any [`from_bytes`](Self::from_bytes) length fault
    /// - `UnsupportedVersion`: version byte other than [`VERSION`]
    pub fn from_bech32(encoded: &str) -> Result<Self> {
        let (hrp, data, variant) = bech32::decode(encoded.trim())
            .map_err(|e| CryptoError::malformed_payload(format!("bech32: {e}")))?;

        if hrp != HRP {
            return Err(CryptoError::malformed_payload(format!(
                "expected prefix '{HRP}', got '{hrp}'"
            )));
        }
        if variant != Variant::Bech32 {
            return Err(CryptoError::malformed_payload("bech32m checksum is not accepted"));
        }

        let bytes = Vec::<u8>::from_base32(&data)
            .map_err(|e| CryptoError::malformed_payload(format!("bech32 data: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLISHED: &str = "ncryptsec1qgg9947rlpvqu76pj5ecreduf9jxhselq2nae2kghhvd5g7dgjtcxfqtd67p9m0w57lspw8gsq6yphnm8623nsl8xn9j4jdzz84zm3frztj3z7s35vpzmqf6ksu8r89qk5z2zxfmu5gv8th8wclt0h4p";

    fn sample() -> KeyEncryptionPayload {
        KeyEncryptionPayload::new(
            16,
            [0x11; SALT_LEN],
            [0x22; NONCE_LEN],
            KeySecurity::NotKnownInsecure,
            [0x33; SEALED_LEN],
        )
    }

    #[test]
    fn layout_offsets() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes[0], VERSION);
        assert_eq!(bytes[1], 16);
        assert_eq!(&bytes[2..18], &[0x11; SALT_LEN]);
        assert_eq!(&bytes[18..42], &[0x22; NONCE_LEN]);
        assert_eq!(bytes[42], 0x01);
        assert_eq!(&bytes[43..], &[0x33; SEALED_LEN]);
    }

    #[test]
    fn parses_published_transcript() {
        let payload = KeyEncryptionPayload::from_bech32(PUBLISHED).unwrap();
        assert_eq!(payload.log_n(), 16);
        assert_eq!(payload.security(), KeySecurity::KnownInsecure);
        assert_eq!(payload.to_bech32(), PUBLISHED);
    }

    #[test]
    fn bytes_roundtrip() {
        let payload = sample();
        assert_eq!(KeyEncryptionPayload::from_bytes(&payload.to_bytes()).unwrap(), payload);
    }

    #[test]
    fn wrong_length_is_malformed() {
        let bytes = sample().to_bytes();
        assert!(matches!(
            KeyEncryptionPayload::from_bytes(&bytes[..90]),
            Err(CryptoError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn wrong_version_is_unsupported() {
        let mut bytes = sample().to_bytes();
        bytes[0] = 0x01;
        assert_eq!(
            KeyEncryptionPayload::from_bytes(&bytes),
            Err(CryptoError::UnsupportedVersion { version: 0x01 })
        );
    }

    #[test]
    fn unknown_security_byte_is_malformed() {
        let mut bytes = sample().to_bytes();
        bytes[42] = 0x03;
        assert!(matches!(
            KeyEncryptionPayload::from_bytes(&bytes),
            Err(CryptoError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn wrong_prefix_is_malformed() {
        let encoded =
            bech32::encode("nsec", sample().to_bytes().to_base32(), Variant::Bech32).unwrap();
        assert!(matches!(
            KeyEncryptionPayload::from_bech32(&encoded),
            Err(CryptoError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn bech32m_is_malformed() {
        let encoded =
            bech32::encode(HRP, sample().to_bytes().to_base32(), Variant::Bech32m).unwrap();
        assert!(matches!(
            KeyEncryptionPayload::from_bech32(&encoded),
            Err(CryptoError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn bad_checksum_is_malformed() {
        let mut encoded = sample().to_bech32();
        let last = encoded.pop().unwrap();
        encoded.push(if last == 'q' { 'p' } else { 'q' });
        assert!(matches!(
            KeyEncryptionPayload::from_bech32(&encoded),
            Err(CryptoError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn security_bytes() {
        for byte in 0..=2u8 {
            assert_eq!(KeySecurity::from_byte(byte).unwrap().to_byte(), byte);
        }
        assert!(KeySecurity::from_byte(3).is_none());
        assert!(KeySecurity::try_from(0xff).is_err());
    }
}
