//! Hierarchical deterministic key derivation (BIP-32, private derivation)
//!
//! # Algorithm
//!
//! ```text
//! seed ──HMAC-SHA512("Bitcoin seed")──► (k, c)
//!                                         │
//!           for each index i in the path  ▼
//!   hardened: data = 0x00 ‖ k ‖ i      normal: data = P(k) ‖ i
//!                                         │
//!                     HMAC-SHA512(c, data) = IL ‖ IR
//!                                         │
//!                     k = IL + k (mod n),  c = IR
//! ```
//!
//! An out-of-range intermediate key is a hard failure. The caller decides
//! whether to try another index; derivation never skips one on its own.
//!
//! Nostr identities live at `m/44'/1237'/<account>'/0/0` (NIP-06).

mod mnemonic;
mod path;

use hmac::{Hmac, Mac};
pub use mnemonic::seed_from_mnemonic;
pub use path::{ChildIndex, DerivationPath, HARDENED_BIT, MAX_DEPTH};
use secp256k1::Scalar;
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::{
    curve::{CurveContext, SecretScalar, public_point},
    error::{CryptoError, Result},
};

type HmacSha512 = Hmac<Sha512>;

/// HMAC key for master key generation
const MASTER_KEY_LABEL: &[u8] = b"Bitcoin seed";

/// Shortest accepted seed (128 bits)
pub const MIN_SEED_LEN: usize = 16;

/// Longest accepted seed (512 bits)
pub const MAX_SEED_LEN: usize = 64;

/// SLIP-44 coin type registered for Nostr
pub const NOSTR_COIN_TYPE: u32 = 1237;

/// Private key plus chain code at one node of the tree.
struct ExtendedKey {
    key: SecretScalar,
    chain_code: Zeroizing<[u8; 32]>,
}

impl ExtendedKey {
    fn master(seed: &[u8]) -> Result<Self> {
        let digest = hmac_sha512(MASTER_KEY_LABEL, seed);
        let key = SecretScalar::from_slice(&digest[..32])?;
        Ok(Self { key, chain_code: chain_code(&digest) })
    }

    /// Derive the child at `index`. `depth` is only used for error reporting.
    fn child(&self, ctx: &CurveContext, index: ChildIndex, depth: usize) -> Result<Self> {
        let mut data = Zeroizing::new([0u8; 37]);
        if index.is_hardened() {
            data[1..33].copy_from_slice(self.key.as_bytes());
        } else {
            data[..33].copy_from_slice(&public_point(ctx, &self.key).compressed());
        }
        data[33..].copy_from_slice(&index.raw().to_be_bytes());

        let digest = hmac_sha512(self.chain_code.as_slice(), data.as_slice());

        let mut left = Zeroizing::new([0u8; 32]);
        left.copy_from_slice(&digest[..32]);

        let tweak = Scalar::from_be_bytes(*left).map_err(|_| {
            tracing::debug!(depth, "child tweak not below curve order");
            CryptoError::InvalidChildKey { depth }
        })?;
        let mut parent = self.key.to_secret_key();
        let sum = parent.add_tweak(&tweak);
        parent.non_secure_erase();
        let child = sum.map_err(|_| {
            tracing::debug!(depth, "child key is zero");
            CryptoError::InvalidChildKey { depth }
        })?;

        Ok(Self { key: SecretScalar::from_secret_key(child), chain_code: chain_code(&digest) })
    }
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Zeroizing<[u8; 64]> {
    let Ok(mut mac) = HmacSha512::new_from_slice(key) else {
        unreachable!("HMAC-SHA512 accepts any key size");
    };
    mac.update(data);

    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

fn chain_code(digest: &[u8; 64]) -> Zeroizing<[u8; 32]> {
    let mut code = Zeroizing::new([0u8; 32]);
    code.copy_from_slice(&digest[32..]);
    code
}

/// Derive the secret scalar at `path` below the master key of `seed`.
///
/// An empty path returns the master key.
///
/// # Errors
///
/// - `InvalidArgument`: seed outside 16–64 bytes, or path deeper than 255
/// - `InvalidScalar`: master key out of range
/// - `InvalidChildKey`: an intermediate child key is out of range
pub fn derive(ctx: &CurveContext, seed: &[u8], path: &DerivationPath) -> Result<SecretScalar> {
    if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
        return Err(CryptoError::invalid_argument(format!(
            "seed must be {MIN_SEED_LEN}-{MAX_SEED_LEN} bytes, got {}",
            seed.len()
        )));
    }
    if path.len() > MAX_DEPTH {
        return Err(CryptoError::invalid_argument(format!(
            "derivation path deeper than {MAX_DEPTH}"
        )));
    }

    let mut node = ExtendedKey::master(seed)?;
    for (position, &index) in path.iter().enumerate() {
        node = node.child(ctx, index, position + 1)?;
    }

    Ok(node.key)
}

/// NIP-06 path for `account`: `m/44'/1237'/<account>'/0/0`.
///
/// # Errors
///
/// - `InvalidArgument`: `account` has the hardened bit set
pub fn nostr_account_path(account: u32) -> Result<DerivationPath> {
    let mut path = DerivationPath::master();
    path.push(ChildIndex::hardened(44)?)?;
    path.push(ChildIndex::hardened(NOSTR_COIN_TYPE)?)?;
    path.push(ChildIndex::hardened(account)?)?;
    path.push(ChildIndex::normal(0)?)?;
    path.push(ChildIndex::normal(0)?)?;
    Ok(path)
}

/// Derive the Nostr identity key for `account` from a seed.
pub fn derive_nostr_key(ctx: &CurveContext, seed: &[u8], account: u32) -> Result<SecretScalar> {
    derive(ctx, seed, &nostr_account_path(account)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn seed() -> Vec<u8> {
        hex::decode(SEED).unwrap()
    }

    #[test]
    fn empty_path_returns_master_key() {
        let ctx = CurveContext::new();
        let key = derive(&ctx, &seed(), &DerivationPath::master()).unwrap();

        let expected = hmac_sha512(MASTER_KEY_LABEL, &seed());
        assert_eq!(key.as_bytes().as_slice(), &expected[..32]);
    }

    #[test]
    fn hardened_child_matches_formula() {
        let ctx = CurveContext::new();
        let master = hmac_sha512(MASTER_KEY_LABEL, &seed());

        let mut data = vec![0u8];
        data.extend_from_slice(&master[..32]);
        data.extend_from_slice(&HARDENED_BIT.to_be_bytes());
        let digest = hmac_sha512(&master[32..], &data);

        let tweak = Scalar::from_be_bytes(digest[..32].try_into().unwrap()).unwrap();
        let expected = SecretScalar::from_slice(&master[..32])
            .unwrap()
            .to_secret_key()
            .add_tweak(&tweak)
            .unwrap();

        let path: DerivationPath = "m/0'".parse().unwrap();
        let key = derive(&ctx, &seed(), &path).unwrap();
        assert_eq!(key.as_bytes(), &expected.secret_bytes());
    }

    #[test]
    fn derivation_is_deterministic() {
        let ctx = CurveContext::new();
        let path: DerivationPath = "m/1/2'/3".parse().unwrap();

        let a = derive(&ctx, &seed(), &path).unwrap();
        let b = derive(&ctx, &seed(), &path).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn hardened_and_normal_siblings_differ() {
        let ctx = CurveContext::new();
        let hardened = derive(&ctx, &seed(), &"m/0'".parse().unwrap()).unwrap();
        let normal = derive(&ctx, &seed(), &"m/0".parse().unwrap()).unwrap();
        assert_ne!(hardened.as_bytes(), normal.as_bytes());
    }

    #[test]
    fn seed_length_is_checked() {
        let ctx = CurveContext::new();
        let path = DerivationPath::master();

        assert!(matches!(
            derive(&ctx, &[0u8; 15], &path),
            Err(CryptoError::InvalidArgument { .. })
        ));
        assert!(matches!(
            derive(&ctx, &[0u8; 65], &path),
            Err(CryptoError::InvalidArgument { .. })
        ));
        assert!(derive(&ctx, &[0u8; 64], &path).is_ok());
    }

    #[test]
    fn nostr_path_layout() {
        assert_eq!(nostr_account_path(0).unwrap().to_string(), "m/44'/1237'/0'/0/0");
        assert_eq!(nostr_account_path(3).unwrap().to_string(), "m/44'/1237'/3'/0/0");
        assert!(nostr_account_path(HARDENED_BIT).is_err());
    }

    #[test]
    fn accounts_produce_distinct_keys() {
        let ctx = CurveContext::new();
        let first = derive_nostr_key(&ctx, &seed(), 0).unwrap();
        let second = derive_nostr_key(&ctx, &seed(), 1).unwrap();
        assert_ne!(first.as_bytes(), second.as_bytes());
    }
}
