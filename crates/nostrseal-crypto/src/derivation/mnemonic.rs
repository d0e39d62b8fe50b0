//! BIP-39 mnemonic to seed conversion

use bip39::Mnemonic;
use zeroize::Zeroizing;

use crate::{
    error::{CryptoError, Result},
    passphrase::PassphraseNormalizer,
};

/// Convert an English BIP-39 mnemonic into a 64-byte seed.
///
/// Words are matched case-insensitively and may be separated by any
/// whitespace. The checksum word is verified. `passphrase` is the optional
/// BIP-39 extension word; BIP-39 expects `normalizer` to produce NFKD.
/// Nostr (NIP-06) uses the empty string.
///
/// # Errors
///
/// - `InvalidArgument`: unknown word, wrong word count or bad checksum
pub fn seed_from_mnemonic<N>(
    phrase: &str,
    passphrase: &str,
    normalizer: &N,
) -> Result<Zeroizing<[u8; 64]>>
where
    N: PassphraseNormalizer + ?Sized,
{
    let words = Zeroizing::new(
        phrase.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" "),
    );

    let mnemonic = Mnemonic::parse_normalized(&words)
        .map_err(|e| CryptoError::invalid_argument(format!("mnemonic: {e}")))?;

    let passphrase = normalizer.normalize(passphrase);
    Ok(Zeroizing::new(mnemonic.to_seed_normalized(&passphrase)))
}
