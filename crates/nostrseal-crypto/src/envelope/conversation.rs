//! Per-peer conversation state and the legacy payload policy

use std::fmt;

use super::{ConversationKey, NONCE_LEN, is_legacy, legacy};
use crate::{
    curve::{CurveContext, PublicPoint, SecretScalar, SharedSecret, ecdh_x},
    error::{CryptoError, Result},
    secure::SecureBuffer,
};

/// Handling of legacy NIP-04 `?iv=` payloads on decrypt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LegacyPolicy {
    /// Refuse legacy payloads with `PolicyRejected` (strict mode)
    #[default]
    Reject,
    /// Decrypt legacy payloads. They are never produced.
    Decrypt,
}

/// Envelope behavior for a [`Conversation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// Legacy payload handling
    pub legacy: LegacyPolicy,
}

/// Envelope endpoint for one local secret and one peer.
///
/// Holds the conversation key and, only when [`LegacyPolicy::Decrypt`] is
/// configured, the raw ECDH x coordinate that legacy payloads are keyed by.
pub struct Conversation {
    key: ConversationKey,
    legacy_secret: Option<SharedSecret>,
    config: EnvelopeConfig,
}

impl Conversation {
    /// Run the key agreement between `secret` and `peer`.
    ///
    /// # Errors
    ///
    /// - `InvalidScalar`: agreement produced the point at infinity
    pub fn establish(
        ctx: &CurveContext,
        secret: &SecretScalar,
        peer: &PublicPoint,
        config: EnvelopeConfig,
    ) -> Result<Self> {
        let shared = ecdh_x(ctx, secret, peer)?;
        let key = ConversationKey::from_shared_secret(&shared);

        let legacy_secret = match config.legacy {
            LegacyPolicy::Reject => None,
            LegacyPolicy::Decrypt => Some(shared),
        };

        Ok(Self { key, legacy_secret, config })
    }

    /// Conversation key for the stateless envelope functions.
    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    /// Active configuration.
    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Encrypt with a fresh random nonce. Always produces version 2.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        super::encrypt(&self.key, plaintext)
    }

    /// Encrypt with a caller-chosen nonce.
    pub fn encrypt_with_nonce(&self, plaintext: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<String> {
        super::encrypt_with_nonce(&self.key, plaintext, nonce)
    }

    /// Decrypt a payload into a secure buffer.
    ///
    /// # Errors
    ///
    /// - `PolicyRejected`: legacy payload in strict mode, before any decoding
    /// - otherwise as [`super::decrypt_secure`], or for legacy payloads
    ///   `MalformedEnvelope` / `AuthenticationFailed`
    pub fn decrypt_secure(&self, payload: &str) -> Result<SecureBuffer> {
        if is_legacy(payload) {
            return self.decrypt_legacy(payload);
        }
        super::decrypt_secure(&self.key, payload)
    }

    /// Decrypt a payload.
    ///
    /// # Errors
    ///
    /// See [`Conversation::decrypt_secure`].
    pub fn decrypt(&self, payload: &str) -> Result<Vec<u8>> {
        Ok(self.decrypt_secure(payload)?.to_vec())
    }

    fn decrypt_legacy(&self, payload: &str) -> Result<SecureBuffer> {
        let Some(shared) = &self.legacy_secret else {
            tracing::debug!(payload_len = payload.len(), "legacy payload rejected in strict mode");
            return Err(CryptoError::PolicyRejected {
                reason: "legacy ?iv= payloads are disabled".to_owned(),
            });
        };
        legacy::decrypt(shared, payload)
    }
}

impl fmt::Debug for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation").field("config", &self.config).finish_non_exhaustive()
    }
}
