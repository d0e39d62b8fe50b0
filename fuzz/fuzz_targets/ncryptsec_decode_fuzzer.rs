//! Fuzz target for ncryptsec parsing
//!
//! Exercises bech32 decoding and payload layout checks only. scrypt is never
//! reached: the cost ceiling is set to zero so every parsed payload is
//! refused before key derivation.
//!
//! # Invariants
//!
//! - Parsing never panics
//! - Any parsed payload re-encodes to the same 91 bytes
//! - Raw 91-byte inputs either parse or report a layout error

#![no_main]

use libfuzzer_sys::fuzz_target;
use nostrseal_crypto::{
    CryptoError, KeyEncryptionPayload, KeyEncryptor, KeyExportConfig, key_export::PAYLOAD_LEN,
};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(payload) = KeyEncryptionPayload::from_bech32(text) {
            let reparsed = KeyEncryptionPayload::from_bech32(&payload.to_bech32());
            assert_eq!(reparsed.as_ref(), Ok(&payload));

            let refusing = KeyEncryptor::new(KeyExportConfig { max_log_n: 0 });
            assert!(matches!(
                refusing.decrypt_payload(&payload, "fuzz"),
                Err(CryptoError::InvalidArgument { .. })
            ));
        }
    }

    match KeyEncryptionPayload::from_bytes(data) {
        Ok(payload) => assert_eq!(&payload.to_bytes()[..], data),
        Err(CryptoError::MalformedPayload { .. } | CryptoError::UnsupportedVersion { .. }) => {
            assert!(data.len() != PAYLOAD_LEN || data[0] != 0x02 || data[42] > 0x02);
        },
        Err(other) => panic!("unexpected error: {other}"),
    }
});
