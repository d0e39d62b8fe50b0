//! Passphrase-protected secret keys (NIP-49 `ncryptsec`)
//!
//! ```text
//! passphrase ──normalize──► scrypt(salt, N = 2^log_n, r = 8, p = 1) ──► key
//!                                                                        │
//! secret (32) ──XChaCha20-Poly1305(key, nonce, aad = security)──► ct + tag (48)
//! ```
//!
//! The scrypt cost is chosen by whoever produced the payload, so decryption
//! refuses any `log_n` above [`KeyExportConfig::max_log_n`] before doing
//! any work.

mod payload;

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
pub use payload::{
    HRP, KeyEncryptionPayload, KeySecurity, NONCE_LEN, PAYLOAD_LEN, SALT_LEN, SEALED_LEN, VERSION,
};
use rand::{RngCore, rngs::OsRng};
use zeroize::Zeroizing;

use crate::{
    curve::SecretScalar,
    error::{CryptoError, Result},
    passphrase::{Identity, PassphraseNormalizer},
};

/// scrypt block size
const SCRYPT_R: u32 = 8;

/// scrypt parallelism
const SCRYPT_P: u32 = 1;

/// Symmetric key length
const KEY_LEN: usize = 32;

/// Default ceiling on the scrypt cost exponent (4 GiB of scrypt memory)
pub const DEFAULT_MAX_LOG_N: u8 = 22;

/// Limits applied to key-encryption payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyExportConfig {
    /// Largest accepted scrypt cost exponent, on encrypt and on decrypt
    pub max_log_n: u8,
}

impl Default for KeyExportConfig {
    fn default() -> Self {
        Self { max_log_n: DEFAULT_MAX_LOG_N }
    }
}

/// A secret key recovered from an `ncryptsec` payload.
#[derive(Debug)]
pub struct DecryptedKey {
    /// Recovered secret scalar
    pub secret: SecretScalar,
    /// Handling flag stored alongside it
    pub security: KeySecurity,
    /// scrypt cost exponent it was protected with
    pub log_n: u8,
}

/// Encrypts and decrypts secret keys under a passphrase.
///
/// `N` canonicalizes passphrases before scrypt. The default passes them
/// through unchanged; interoperable clients normalize to NFKC.
#[derive(Debug, Clone, Default)]
pub struct KeyEncryptor<N = Identity> {
    normalizer: N,
    config: KeyExportConfig,
}

impl KeyEncryptor<Identity> {
    /// Encryptor without passphrase normalization.
    pub fn new(config: KeyExportConfig) -> Self {
        Self { normalizer: Identity, config }
    }
}

impl<N: PassphraseNormalizer> KeyEncryptor<N> {
    /// Encryptor with a custom passphrase normalizer.
    pub fn with_normalizer(normalizer: N, config: KeyExportConfig) -> Self {
        Self { normalizer, config }
    }

    /// Active limits.
    pub fn config(&self) -> &KeyExportConfig {
        &self.config
    }

    /// Encrypt `secret` with a fresh random salt and nonce and return the
    /// bech32 transcript.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: `log_n` is zero or above the configured maximum
    pub fn encrypt(
        &self,
        secret: &SecretScalar,
        passphrase: &str,
        log_n: u8,
        security: KeySecurity,
    ) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        Ok(self.encrypt_with(secret, passphrase, log_n, security, salt, nonce)?.to_bech32())
    }

    /// Encrypt `secret` with caller-chosen salt and nonce.
    ///
    /// # Errors
    ///
    /// See [`KeyEncryptor::encrypt`].
    pub fn encrypt_with(
        &self,
        secret: &SecretScalar,
        passphrase: &str,
        log_n: u8,
        security: KeySecurity,
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
    ) -> Result<KeyEncryptionPayload> {
        self.check_cost(log_n)?;
        let cipher = self.cipher(passphrase, log_n, &salt)?;

        let aad = [security.to_byte()];
        let Ok(ciphertext) = cipher.encrypt(
            XNonce::from_slice(&nonce),
            Payload { msg: secret.as_bytes(), aad: &aad },
        ) else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail for a 32-byte message");
        };

        let mut sealed = [0u8; SEALED_LEN];
        sealed.copy_from_slice(&ciphertext);

        Ok(KeyEncryptionPayload::new(log_n, salt, nonce, security, sealed))
    }

    /// Decrypt an `ncryptsec1…` transcript.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload`: bech32 or layout fault
    /// - `UnsupportedVersion`: unknown version byte
    /// - `InvalidArgument`: `log_n` above the configured maximum
    /// - `AuthenticationFailed`: wrong passphrase or tampered payload
    /// - `InvalidScalar`: authentic payload holding an out-of-range key
    pub fn decrypt(&self, encoded: &str, passphrase: &str) -> Result<DecryptedKey> {
        let payload = KeyEncryptionPayload::from_bech32(encoded)?;
        self.decrypt_payload(&payload, passphrase)
    }

    /// Decrypt an already parsed payload.
    ///
    /// # Errors
    ///
    /// See [`KeyEncryptor::decrypt`].
    pub fn decrypt_payload(
        &self,
        payload: &KeyEncryptionPayload,
        passphrase: &str,
    ) -> Result<DecryptedKey> {
        let log_n = payload.log_n();
        self.check_cost(log_n)?;
        let cipher = self.cipher(passphrase, log_n, payload.salt())?;

        let aad = [payload.security().to_byte()];
        let plaintext = cipher
            .decrypt(
                XNonce::from_slice(payload.nonce()),
                Payload { msg: payload.sealed(), aad: &aad },
            )
            .map(Zeroizing::new)
            .map_err(|_| {
                tracing::debug!(log_n, "ncryptsec authentication failed");
                CryptoError::AuthenticationFailed
            })?;

        let secret = SecretScalar::from_slice(&plaintext)?;

        Ok(DecryptedKey { secret, security: payload.security(), log_n })
    }

    fn check_cost(&self, log_n: u8) -> Result<()> {
        if log_n == 0 || log_n > self.config.max_log_n {
            tracing::debug!(log_n, max_log_n = self.config.max_log_n, "scrypt cost refused");
            return Err(CryptoError::invalid_argument(format!(
                "log_n {log_n} outside 1..={}",
                self.config.max_log_n
            )));
        }
        Ok(())
    }

    fn cipher(&self, passphrase: &str, log_n: u8, salt: &[u8; SALT_LEN]) -> Result<XChaCha20Poly1305> {
        let key = self.derive_key(passphrase, log_n, salt)?;
        Ok(XChaCha20Poly1305::new(Key::from_slice(key.as_slice())))
    }

    fn derive_key(
        &self,
        passphrase: &str,
        log_n: u8,
        salt: &[u8; SALT_LEN],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let params = scrypt::Params::new(log_n, SCRYPT_R, SCRYPT_P, KEY_LEN)
            .map_err(|e| CryptoError::invalid_argument(format!("scrypt parameters: {e}")))?;

        let normalized = self.normalizer.normalize(passphrase);
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        let Ok(()) = scrypt::scrypt(normalized.as_bytes(), salt, &params, key.as_mut_slice()) else {
            unreachable!("output length matches the scrypt parameters");
        };

        Ok(key)
    }
}

/// Encrypt `secret` with default limits and no passphrase normalization.
///
/// # Errors
///
/// See [`KeyEncryptor::encrypt`].
pub fn encrypt(
    secret: &SecretScalar,
    passphrase: &str,
    log_n: u8,
    security: KeySecurity,
) -> Result<String> {
    KeyEncryptor::new(KeyExportConfig::default()).encrypt(secret, passphrase, log_n, security)
}

/// Decrypt an `ncryptsec1…` transcript with default limits and no
/// passphrase normalization.
///
/// # Errors
///
/// See [`KeyEncryptor::decrypt`].
pub fn decrypt(encoded: &str, passphrase: &str) -> Result<DecryptedKey> {
    KeyEncryptor::new(KeyExportConfig::default()).decrypt(encoded, passphrase)
}
