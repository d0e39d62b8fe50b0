//! Conversation and per-message key derivation using HKDF-SHA256

use std::fmt;

use chacha20::{
    ChaCha20,
    cipher::{KeyIvInit, StreamCipher},
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::{
    curve::{CurveContext, PublicPoint, SecretScalar, SharedSecret, ecdh_x},
    error::{CryptoError, Result},
};

type HmacSha256 = Hmac<Sha256>;

/// HKDF salt for conversation keys
const CONVERSATION_SALT: &[u8] = b"nip44-v2";

/// Length of the expanded message key material
const MESSAGE_KEYS_LEN: usize = 76;

/// Length of the per-message random nonce
pub const NONCE_LEN: usize = 32;

/// Length of the HMAC-SHA256 tag
pub const MAC_LEN: usize = 32;

/// Symmetric key shared by one unordered pair of identities.
///
/// Both parties derive the same value. Zeroized on drop.
pub struct ConversationKey {
    key: [u8; 32],
}

impl ConversationKey {
    /// Derive the conversation key between `secret` and `peer`.
    pub fn derive(ctx: &CurveContext, secret: &SecretScalar, peer: &PublicPoint) -> Result<Self> {
        let shared = ecdh_x(ctx, secret, peer)?;
        Ok(Self::from_shared_secret(&shared))
    }

    /// HKDF-Extract with salt `nip44-v2` over an ECDH x coordinate.
    ///
    /// Computed as `HMAC-SHA256(salt, x)` so the only copy of the result is
    /// the returned key.
    pub fn from_shared_secret(shared: &SharedSecret) -> Self {
        let Ok(mut extract) = HmacSha256::new_from_slice(CONVERSATION_SALT) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        extract.update(shared.as_bytes());
        let mut prk = extract.finalize().into_bytes();

        let mut key = [0u8; 32];
        key.copy_from_slice(&prk);
        prk.as_mut_slice().zeroize();

        Self { key }
    }

    /// Wrap a previously derived key.
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let mut key = [0u8; 32];
        hex::decode_to_slice(hex_str.trim(), &mut key)
            .map_err(|e| CryptoError::invalid_argument(format!("conversation key hex: {e}")))?;
        Ok(Self { key })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl Drop for ConversationKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConversationKey(<redacted>)")
    }
}

/// Keys for a single message, expanded from the conversation key and the
/// message nonce.
///
/// ```text
/// HKDF-Expand(conversation_key, info = nonce, L = 76)
///   [0..32]  ChaCha20 key
///   [32..44] ChaCha20 nonce
///   [44..76] HMAC-SHA256 key
/// ```
pub struct MessageKeys {
    chacha_key: [u8; 32],
    chacha_nonce: [u8; 12],
    hmac_key: [u8; 32],
}

impl MessageKeys {
    /// Expand the keys for `nonce`.
    pub fn derive(key: &ConversationKey, nonce: &[u8; NONCE_LEN]) -> Self {
        let Ok(hkdf) = Hkdf::<Sha256>::from_prk(key.as_bytes()) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 PRK length");
        };

        let mut okm = Zeroizing::new([0u8; MESSAGE_KEYS_LEN]);
        let Ok(()) = hkdf.expand(nonce, okm.as_mut_slice()) else {
            unreachable!("76 bytes is a valid HKDF-SHA256 output length");
        };

        let mut keys = Self { chacha_key: [0u8; 32], chacha_nonce: [0u8; 12], hmac_key: [0u8; 32] };
        keys.chacha_key.copy_from_slice(&okm[0..32]);
        keys.chacha_nonce.copy_from_slice(&okm[32..44]);
        keys.hmac_key.copy_from_slice(&okm[44..76]);
        keys
    }

    /// ChaCha20 key.
    pub fn chacha_key(&self) -> &[u8; 32] {
        &self.chacha_key
    }

    /// 12-byte ChaCha20 (IETF) nonce.
    pub fn chacha_nonce(&self) -> &[u8; 12] {
        &self.chacha_nonce
    }

    /// HMAC-SHA256 key.
    pub fn hmac_key(&self) -> &[u8; 32] {
        &self.hmac_key
    }

    /// XOR the ChaCha20 keystream (block counter 0) into `buffer`.
    pub(crate) fn apply_keystream(&self, buffer: &mut [u8]) {
        let mut cipher = ChaCha20::new(
            chacha20::Key::from_slice(&self.chacha_key),
            chacha20::Nonce::from_slice(&self.chacha_nonce),
        );
        cipher.apply_keystream(buffer);
    }

    /// HMAC-SHA256 over `nonce ‖ ciphertext`.
    pub(crate) fn mac(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> [u8; MAC_LEN] {
        let mut tag = [0u8; MAC_LEN];
        tag.copy_from_slice(&self.keyed_mac(nonce, ciphertext).finalize().into_bytes());
        tag
    }

    /// Constant-time check of `tag` against `nonce ‖ ciphertext`.
    pub(crate) fn verify_mac(
        &self,
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<()> {
        self.keyed_mac(nonce, ciphertext)
            .verify_slice(tag)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }

    fn keyed_mac(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> HmacSha256 {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.hmac_key) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac.update(nonce);
        mac.update(ciphertext);
        mac
    }
}

impl Drop for MessageKeys {
    fn drop(&mut self) {
        self.chacha_key.zeroize();
        self.chacha_nonce.zeroize();
        self.hmac_key.zeroize();
    }
}
