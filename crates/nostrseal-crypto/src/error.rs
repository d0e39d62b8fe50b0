//! Error types for key derivation and envelope operations

use thiserror::Error;

/// Coarse classification of a [`CryptoError`].
///
/// Collaborators that only need to know which class of failure occurred
/// (for user-facing messages or FFI status codes) match on this instead of
/// the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Null, empty or wrong-length input
    InvalidArgument,
    /// Secure allocation failed
    NoMemory,
    /// Scalar out of range, including rejected child keys
    InvalidScalar,
    /// Point not on the curve
    InvalidPoint,
    /// base64 / bech32 decode, checksum or framing failure
    EncodingError,
    /// Unknown format version byte
    UnsupportedVersion,
    /// MAC or AEAD tag mismatch (tampering or wrong passphrase)
    AuthenticationFailed,
    /// Structural padding violation after authentication
    InvalidPadding,
    /// Format disallowed by the active policy
    PolicyRejected,
}

/// Errors from derivation and envelope operations.
///
/// Every failure is local and deterministic. None of them is transient, so
/// none should be retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Input has the wrong length or shape
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the input
        reason: String,
    },

    /// Secure buffer allocation failed
    #[error("out of memory allocating {requested} secure bytes")]
    NoMemory {
        /// Number of bytes requested
        requested: usize,
    },

    /// Secret scalar is zero or not below the curve order
    #[error("invalid secret scalar")]
    InvalidScalar,

    /// Public point is not a valid curve point
    #[error("invalid public point")]
    InvalidPoint,

    /// Child derivation produced an out-of-range key
    #[error("invalid child key at depth {depth}")]
    InvalidChildKey {
        /// Path position (1-based) where derivation failed
        depth: usize,
    },

    /// Message envelope could not be decoded
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// Reason the envelope was rejected
        reason: String,
    },

    /// Key-encryption transcript could not be decoded
    #[error("malformed payload: {reason}")]
    MalformedPayload {
        /// Reason the payload was rejected
        reason: String,
    },

    /// Format version byte is not supported
    #[error("unsupported version: {version:#04x}")]
    UnsupportedVersion {
        /// Version byte found in the input
        version: u8,
    },

    /// MAC or AEAD tag did not verify
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Decrypted buffer violates the padding layout
    #[error("invalid padding: {reason}")]
    InvalidPadding {
        /// Which padding rule was violated
        reason: String,
    },

    /// Input format is disallowed by the active policy
    #[error("rejected by policy: {reason}")]
    PolicyRejected {
        /// Which policy rejected the input
        reason: String,
    },
}

impl CryptoError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument { reason: reason.into() }
    }

    pub(crate) fn malformed_envelope(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope { reason: reason.into() }
    }

    pub(crate) fn malformed_payload(reason: impl Into<String>) -> Self {
        Self::MalformedPayload { reason: reason.into() }
    }

    pub(crate) fn invalid_padding(reason: impl Into<String>) -> Self {
        Self::InvalidPadding { reason: reason.into() }
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NoMemory { .. } => ErrorKind::NoMemory,
            Self::InvalidScalar | Self::InvalidChildKey { .. } => ErrorKind::InvalidScalar,
            Self::InvalidPoint => ErrorKind::InvalidPoint,
            Self::MalformedEnvelope { .. } | Self::MalformedPayload { .. } => {
                ErrorKind::EncodingError
            },
            Self::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Self::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            Self::InvalidPadding { .. } => ErrorKind::InvalidPadding,
            Self::PolicyRejected { .. } => ErrorKind::PolicyRejected,
        }
    }

    /// Returns true if the input failed an integrity check.
    ///
    /// Covers tag mismatches and padding faults found after a MAC verified.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::InvalidPadding { .. })
    }
}

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, CryptoError>;
