//! secp256k1 key types and x-only Diffie-Hellman
//!
//! All curve operations take an explicit [`CurveContext`]. Build one at
//! startup and share it by reference or `Arc`: it is immutable after
//! construction and safe for concurrent use from any number of threads.

use std::fmt;

use rand::rngs::OsRng;
use secp256k1::{All, Parity, PublicKey, Scalar, Secp256k1, SecretKey, XOnlyPublicKey};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, Result};

/// Length of a serialized secret scalar
pub const SECRET_KEY_LEN: usize = 32;

/// Length of an x-only public key
pub const X_ONLY_LEN: usize = 32;

/// Length of a compressed public key
pub const COMPRESSED_LEN: usize = 33;

/// Precomputed secp256k1 context with blinding applied.
pub struct CurveContext {
    secp: Secp256k1<All>,
}

impl CurveContext {
    /// Build a context and randomize it with OS entropy.
    ///
    /// Randomization blinds scalar multiplications against timing and power
    /// side channels. It does not affect any output.
    pub fn new() -> Self {
        let mut secp = Secp256k1::new();
        secp.randomize(&mut OsRng);
        Self { secp }
    }

    pub(crate) fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }
}

impl Default for CurveContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CurveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveContext").finish_non_exhaustive()
    }
}

/// A secret scalar in `[1, n-1]`, stored big-endian.
///
/// Zeroized on drop.
#[derive(Clone)]
pub struct SecretScalar {
    bytes: [u8; SECRET_KEY_LEN],
}

impl SecretScalar {
    /// Validate 32 big-endian bytes as a secret scalar.
    ///
    /// # Errors
    ///
    /// - `InvalidScalar`: value is zero or not below the curve order
    pub fn from_bytes(bytes: [u8; SECRET_KEY_LEN]) -> Result<Self> {
        SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidScalar)?;
        Ok(Self { bytes })
    }

    /// Validate a byte slice as a secret scalar.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: slice is not 32 bytes
    /// - `InvalidScalar`: value is zero or not below the curve order
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let Ok(array) = <[u8; SECRET_KEY_LEN]>::try_from(bytes) else {
            return Err(CryptoError::invalid_argument(format!(
                "secret key must be {SECRET_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        };
        Self::from_bytes(array)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; SECRET_KEY_LEN]);
        hex::decode_to_slice(hex_str.trim(), bytes.as_mut_slice())
            .map_err(|e| CryptoError::invalid_argument(format!("secret key hex: {e}")))?;
        Self::from_bytes(*bytes)
    }

    /// Generate a fresh scalar from OS entropy.
    pub fn generate() -> Self {
        Self::from_secret_key(SecretKey::new(&mut OsRng))
    }

    /// Big-endian bytes of the scalar.
    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.bytes
    }

    /// Lowercase hex encoding, wiped on drop.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }

    pub(crate) fn from_secret_key(mut key: SecretKey) -> Self {
        let scalar = Self { bytes: key.secret_bytes() };
        key.non_secure_erase();
        scalar
    }

    pub(crate) fn to_secret_key(&self) -> SecretKey {
        let Ok(key) = SecretKey::from_slice(&self.bytes) else {
            unreachable!("scalar range is checked at construction");
        };
        key
    }
}

impl Drop for SecretScalar {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretScalar(<redacted>)")
    }
}

/// A validated secp256k1 public point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicPoint {
    key: PublicKey,
}

impl PublicPoint {
    /// Parse an x-only (32 bytes, even y) or compressed (33 bytes) key.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: length is neither 32 nor 33
    /// - `InvalidPoint`: bytes do not encode a curve point
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key = match bytes.len() {
            X_ONLY_LEN => {
                let x_only =
                    XOnlyPublicKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPoint)?;
                PublicKey::from_x_only_public_key(x_only, Parity::Even)
            },
            COMPRESSED_LEN => PublicKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPoint)?,
            other => {
                return Err(CryptoError::invalid_argument(format!(
                    "public key must be {X_ONLY_LEN} or {COMPRESSED_LEN} bytes, got {other}"
                )));
            },
        };
        Ok(Self { key })
    }

    /// Parse a hex-encoded x-only or compressed key.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| CryptoError::invalid_argument(format!("public key hex: {e}")))?;
        Self::from_slice(&bytes)
    }

    /// 32-byte x coordinate.
    pub fn x_only(&self) -> [u8; X_ONLY_LEN] {
        self.key.x_only_public_key().0.serialize()
    }

    /// 33-byte compressed encoding.
    pub fn compressed(&self) -> [u8; COMPRESSED_LEN] {
        self.key.serialize()
    }

    /// Lowercase hex of the x-only encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.x_only())
    }
}

/// X coordinate of an ECDH shared point. Zeroized on drop.
pub struct SharedSecret {
    x: [u8; 32],
}

impl SharedSecret {
    /// Raw x coordinate.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.x
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Multiply `public` by `secret` and keep only the x coordinate.
///
/// Swapping the roles of the two parties yields the same value.
pub fn ecdh_x(ctx: &CurveContext, secret: &SecretScalar, public: &PublicPoint) -> Result<SharedSecret> {
    let tweak = Scalar::from_be_bytes(*secret.as_bytes()).map_err(|_| CryptoError::InvalidScalar)?;
    let point = public.key.mul_tweak(ctx.secp(), &tweak).map_err(|_| CryptoError::InvalidScalar)?;

    let serialized = Zeroizing::new(point.serialize());
    let mut x = [0u8; 32];
    x.copy_from_slice(&serialized[1..COMPRESSED_LEN]);

    Ok(SharedSecret { x })
}

/// Public point of a secret scalar.
pub fn public_point(ctx: &CurveContext, secret: &SecretScalar) -> PublicPoint {
    let mut key = secret.to_secret_key();
    let public = PublicKey::from_secret_key(ctx.secp(), &key);
    key.non_secure_erase();
    PublicPoint { key: public }
}

/// 32-byte x-only public key of a secret scalar.
pub fn x_only_public_key(ctx: &CurveContext, secret: &SecretScalar) -> [u8; X_ONLY_LEN] {
    public_point(ctx, secret).x_only()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATOR_X: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const CURVE_ORDER: &str = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";

    fn scalar(last: u8) -> SecretScalar {
        let mut bytes = [0u8; 32];
        bytes[31] = last;
        SecretScalar::from_bytes(bytes).unwrap()
    }

    #[test]
    fn zero_scalar_is_rejected() {
        assert_eq!(SecretScalar::from_bytes([0u8; 32]).unwrap_err(), CryptoError::InvalidScalar);
    }

    #[test]
    fn curve_order_is_rejected() {
        assert_eq!(SecretScalar::from_hex(CURVE_ORDER).unwrap_err(), CryptoError::InvalidScalar);
    }

    #[test]
    fn wrong_length_scalar_is_invalid_argument() {
        let err = SecretScalar::from_slice(&[1u8; 31]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidArgument { .. }));
    }

    #[test]
    fn scalar_one_maps_to_generator() {
        let ctx = CurveContext::new();
        assert_eq!(hex::encode(x_only_public_key(&ctx, &scalar(1))), GENERATOR_X);
    }

    #[test]
    fn x_only_and_compressed_parse_to_same_x() {
        let ctx = CurveContext::new();
        let point = public_point(&ctx, &scalar(7));

        let from_x = PublicPoint::from_slice(&point.x_only()).unwrap();
        let from_compressed = PublicPoint::from_slice(&point.compressed()).unwrap();

        assert_eq!(from_x.x_only(), from_compressed.x_only());
    }

    #[test]
    fn off_curve_x_is_invalid_point() {
        // x = 5 has no matching y on secp256k1
        let mut bytes = [0u8; 32];
        bytes[31] = 5;
        assert_eq!(PublicPoint::from_slice(&bytes).unwrap_err(), CryptoError::InvalidPoint);
    }

    #[test]
    fn bad_public_key_length() {
        let err = PublicPoint::from_slice(&[2u8; 20]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidArgument { .. }));
    }

    #[test]
    fn ecdh_is_symmetric() {
        let ctx = CurveContext::new();
        let alice = SecretScalar::generate();
        let bob = SecretScalar::generate();

        let ab = ecdh_x(&ctx, &alice, &public_point(&ctx, &bob)).unwrap();
        let ba = ecdh_x(&ctx, &bob, &public_point(&ctx, &alice)).unwrap();

        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn ecdh_with_scalar_one_returns_peer_x() {
        let ctx = CurveContext::new();
        let peer = public_point(&ctx, &scalar(2));

        let shared = ecdh_x(&ctx, &scalar(1), &peer).unwrap();
        assert_eq!(shared.as_bytes(), &peer.x_only());
    }

    #[test]
    fn hex_roundtrip() {
        let secret = scalar(42);
        let parsed = SecretScalar::from_hex(&secret.to_hex()).unwrap();
        assert_eq!(parsed.as_bytes(), secret.as_bytes());
    }

    #[test]
    fn debug_is_redacted() {
        assert_eq!(format!("{:?}", scalar(9)), "SecretScalar(<redacted>)");
    }
}
