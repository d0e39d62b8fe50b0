//! Fuzz target for envelope decryption
//!
//! # Strategy
//!
//! - Arbitrary payload text, including legacy `?iv=` framing
//! - Valid envelopes with a single mutated byte
//! - Both legacy policies
//!
//! # Invariants
//!
//! - Decryption never panics
//! - Strict mode and the stateless functions never decrypt a legacy payload
//! - A mutated envelope never decrypts
//! - Unmodified envelopes always round-trip

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nostrseal_crypto::{
    Conversation, ConversationKey, CryptoError, CurveContext, EnvelopeConfig, LegacyPolicy,
    SecretScalar,
    curve::public_point,
    envelope::{self, Envelope},
};

#[derive(Debug, Arbitrary)]
enum Input {
    /// Raw payload text
    Text(String),
    /// Valid envelope with one byte mutated
    Mutated { plaintext: Vec<u8>, nonce: [u8; 32], index: u16, mask: u8 },
}

fn scalar(last: u8) -> SecretScalar {
    let mut bytes = [0u8; 32];
    bytes[31] = last;
    let Ok(scalar) = SecretScalar::from_bytes(bytes) else {
        unreachable!("small non-zero scalar");
    };
    scalar
}

fuzz_target!(|input: Input| {
    let ctx = CurveContext::new();
    let peer = public_point(&ctx, &scalar(2));

    let Ok(strict) = Conversation::establish(&ctx, &scalar(1), &peer, EnvelopeConfig::default())
    else {
        return;
    };
    let lenient = EnvelopeConfig { legacy: LegacyPolicy::Decrypt };
    let Ok(permissive) = Conversation::establish(&ctx, &scalar(1), &peer, lenient) else {
        return;
    };

    match input {
        Input::Text(payload) => {
            let strict_result = strict.decrypt(&payload);
            let _ = permissive.decrypt(&payload);

            let stateless_result = envelope::decrypt(strict.key(), &payload);

            if envelope::is_legacy(&payload) {
                assert!(matches!(strict_result, Err(CryptoError::PolicyRejected { .. })));
                assert!(matches!(stateless_result, Err(CryptoError::PolicyRejected { .. })));
            }
        },
        Input::Mutated { plaintext, nonce, index, mask } => {
            let key: &ConversationKey = strict.key();
            let Ok(payload) = envelope::encrypt_with_nonce(key, &plaintext, &nonce) else {
                return;
            };
            assert_eq!(envelope::decrypt(key, &payload).ok(), Some(plaintext));

            let Ok(mut decoded) = Envelope::decode(&payload) else {
                unreachable!("freshly encrypted envelope decodes");
            };
            if mask == 0 {
                return;
            }
            let body_len = decoded.ciphertext.len();
            let index = usize::from(index) % (32 + body_len + 32);
            if index < 32 {
                decoded.nonce[index] ^= mask;
            } else if index < 32 + body_len {
                decoded.ciphertext[index - 32] ^= mask;
            } else {
                decoded.mac[index - 32 - body_len] ^= mask;
            }

            assert_eq!(
                envelope::decrypt(key, &decoded.encode()),
                Err(CryptoError::AuthenticationFailed)
            );
        },
    }
});
