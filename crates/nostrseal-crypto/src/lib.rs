//! Nostr Key and Envelope Cryptography
//!
//! Key derivation and encryption envelopes for Nostr identities. Every
//! operation is a synchronous, stateless transformation of caller-owned
//! inputs. The only shared value is a [`CurveContext`], built once and
//! passed by reference.
//!
//! # Key Lifecycle
//!
//! ```text
//! mnemonic ──BIP-39──► seed ──BIP-32 m/44'/1237'/n'/0/0──► secret scalar
//!                                                              │
//!                    ┌─────────────────────────────────────────┤
//!                    ▼                                         ▼
//!        ECDH x with a peer's point              scrypt(passphrase) + AEAD
//!                    │                                         │
//!                    ▼                                         ▼
//!   conversation key ──► message envelopes            ncryptsec1… backup
//! ```
//!
//! # Security
//!
//! Secret material:
//! - Scalars, shared secrets and derived keys are wiped on drop
//! - Decrypted plaintext can be delivered in a [`SecureBuffer`]
//! - `Debug` output never includes key bytes
//!
//! Authenticity:
//! - Envelope MACs are checked in constant time before decryption
//! - ncryptsec payloads bind the key security byte as associated data
//! - Any tag mismatch is [`CryptoError::AuthenticationFailed`] with no
//!   partial output
//!
//! Legacy input:
//! - `?iv=` payloads are rejected unless [`LegacyPolicy::Decrypt`] is set
//! - Legacy payloads are never produced

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod curve;
pub mod derivation;
pub mod envelope;
pub mod error;
pub mod key_export;
pub mod passphrase;
pub mod secure;

pub use curve::{CurveContext, PublicPoint, SecretScalar, SharedSecret, ecdh_x};
pub use derivation::{
    ChildIndex, DerivationPath, derive, derive_nostr_key, nostr_account_path, seed_from_mnemonic,
};
pub use envelope::{Conversation, ConversationKey, EnvelopeConfig, LegacyPolicy};
pub use error::{CryptoError, ErrorKind, Result};
pub use key_export::{DecryptedKey, KeyEncryptionPayload, KeyEncryptor, KeyExportConfig, KeySecurity};
pub use passphrase::{Identity, PassphraseNormalizer};
pub use secure::SecureBuffer;
