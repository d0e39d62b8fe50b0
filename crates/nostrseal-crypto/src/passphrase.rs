//! Passphrase canonicalization hook
//!
//! Passphrase-based key derivation is byte-exact, so two visually identical
//! passphrases in different Unicode forms derive different keys. The host
//! supplies the canonicalization (typically NFKC); the crate ships only the
//! identity transform.

use zeroize::Zeroizing;

/// Canonicalizes a passphrase before key derivation.
///
/// Closures of type `Fn(&str) -> String` implement this trait.
pub trait PassphraseNormalizer {
    /// Return the canonical form of `passphrase`.
    fn normalize(&self, passphrase: &str) -> Zeroizing<String>;
}

/// Passes passphrases through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl PassphraseNormalizer for Identity {
    fn normalize(&self, passphrase: &str) -> Zeroizing<String> {
        Zeroizing::new(passphrase.to_owned())
    }
}

impl<F> PassphraseNormalizer for F
where
    F: Fn(&str) -> String,
{
    fn normalize(&self, passphrase: &str) -> Zeroizing<String> {
        Zeroizing::new(self(passphrase))
    }
}
