// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 模糊测试：加密和解密功能

use aes_gcm::aead::{AeadInPlace, KeyInit};
use blockwise::{Algorithm, Cipher, CryptoError, Engine, Mode};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::select;
use rand::RngCore;

const BLOCK_MODES: [Mode; 6] = [
    Mode::Ecb,
    Mode::Cbc,
    Mode::Ctr,
    Mode::Cfb,
    Mode::Cfb8,
    Mode::Ofb,
];

fn aes_key() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        vec(any::<u8>(), 16),
        vec(any::<u8>(), 24),
        vec(any::<u8>(), 32)
    ]
}

fn session(mode: Mode, engine: Engine, key: &[u8], iv: &[u8]) -> Cipher {
    let mut cipher = Cipher::new(Algorithm::Aes, mode).unwrap();
    cipher.set_preferred_engine(engine);
    cipher.set_key(key).unwrap();
    if cipher.uses_iv() {
        cipher.set_iv(iv).unwrap();
    }
    cipher
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn round_trip(
        mode in select(BLOCK_MODES.to_vec()),
        key in aes_key(),
        iv in vec(any::<u8>(), 16),
        data in vec(any::<u8>(), 0..200)
    ) {
        let mut cipher = session(mode, Engine::Portable, &key, &iv);
        let ct = cipher.encrypt(&data).unwrap();
        if mode.is_paddable() {
            prop_assert_eq!(ct.len(), (data.len() / 16 + 1) * 16);
        } else {
            prop_assert_eq!(ct.len(), data.len());
        }
        prop_assert_eq!(cipher.decrypt(&ct).unwrap(), data);
    }

    #[test]
    fn engines_agree_with_portable(
        mode in select(BLOCK_MODES.to_vec()),
        engine in select(Engine::DEFAULT_ORDER.to_vec()),
        key in aes_key(),
        iv in vec(any::<u8>(), 16),
        data in vec(any::<u8>(), 0..200)
    ) {
        let mut portable = session(mode, Engine::Portable, &key, &iv);
        let mut other = session(mode, engine, &key, &iv);
        prop_assert_eq!(portable.encrypt(&data).unwrap(), other.encrypt(&data).unwrap());
    }

    #[test]
    fn continuous_buffer_equals_one_call(
        mode in select(vec![Mode::Ctr, Mode::Cfb, Mode::Cfb8, Mode::Ofb]),
        engine in select(Engine::DEFAULT_ORDER.to_vec()),
        key in vec(any::<u8>(), 16),
        iv in vec(any::<u8>(), 16),
        data in vec(any::<u8>(), 0..160),
        cuts in vec(any::<prop::sample::Index>(), 0..4)
    ) {
        let mut whole = session(mode, engine, &key, &iv);
        let expected = whole.encrypt(&data).unwrap();

        let mut split = session(mode, engine, &key, &iv);
        split.enable_continuous_buffer().unwrap();
        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(data.len() + 1)).collect();
        points.push(data.len());
        points.sort_unstable();

        let mut out = Vec::new();
        let mut start = 0;
        for end in points {
            out.extend(split.encrypt(&data[start..end]).unwrap());
            start = end;
        }
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn gcm_matches_aes_gcm(
        key in vec(any::<u8>(), 16),
        nonce in vec(any::<u8>(), 12),
        aad in vec(any::<u8>(), 0..40),
        data in vec(any::<u8>(), 0..120),
        engine in select(Engine::DEFAULT_ORDER.to_vec())
    ) {
        let mut cipher = Cipher::new(Algorithm::Aes, Mode::Gcm).unwrap();
        cipher.set_preferred_engine(engine);
        cipher.set_key(&key).unwrap();
        cipher.set_nonce(&nonce).unwrap();
        cipher.set_aad(&aad).unwrap();
        let ct = cipher.encrypt(&data).unwrap();

        let oracle = aes_gcm::Aes128Gcm::new_from_slice(&key).unwrap();
        let mut expected = data.clone();
        let tag = oracle
            .encrypt_in_place_detached(aes_gcm::Nonce::from_slice(&nonce), &aad, &mut expected)
            .unwrap();
        prop_assert_eq!(ct, expected);
        prop_assert_eq!(cipher.get_tag(16).unwrap(), tag.to_vec());
    }

    #[test]
    fn random_ciphertext_never_panics(
        mode in select(BLOCK_MODES.to_vec()),
        data in vec(any::<u8>(), 0..100)
    ) {
        let mut cipher = session(mode, Engine::Portable, &[0x33; 16], &[0x44; 16]);
        match cipher.decrypt(&data) {
            Ok(_) => {}
            Err(CryptoError::BadDecryption(_)) | Err(CryptoError::InvalidLength(_)) => {
                prop_assert!(mode.is_paddable());
            }
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }
}

/// Non-continuous sessions restart from the original IV on every call.
#[test]
fn fuzz_non_continuous_independence() {
    let mut rng = rand::thread_rng();
    for mode in BLOCK_MODES {
        let mut key = [0u8; 16];
        let mut iv = [0u8; 16];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        let mut cipher = session(mode, Engine::Portable, &key, &iv);
        let first = cipher.encrypt(b"identical input").unwrap();
        for _ in 0..3 {
            assert_eq!(cipher.encrypt(b"identical input").unwrap(), first, "{}", mode);
        }
    }
}
