// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use blockwise::{Algorithm, Cipher, CryptoError, Engine, Mode};

const AAD: &[u8] = b"header";

fn gcm() -> Cipher {
    let mut cipher = Cipher::new(Algorithm::Aes, Mode::Gcm).unwrap();
    cipher.set_key(&[0x24; 32]).unwrap();
    cipher.set_nonce(&[0x11; 12]).unwrap();
    cipher.set_aad(AAD).unwrap();
    cipher
}

fn chacha() -> Cipher {
    let mut cipher = Cipher::new(Algorithm::ChaCha20, Mode::Stream).unwrap();
    cipher.set_key(&[0x24; 32]).unwrap();
    cipher.set_nonce(&[0x11; 12]).unwrap();
    cipher.enable_poly1305().unwrap();
    cipher.set_aad(AAD).unwrap();
    cipher
}

fn ctr_with_poly1305_key(engine: Engine) -> Cipher {
    let mut cipher = Cipher::new(Algorithm::Aes, Mode::Ctr).unwrap();
    cipher.set_preferred_engine(engine);
    cipher.set_key(&[0x24; 16]).unwrap();
    cipher.set_iv(&[0x11; 16]).unwrap();
    cipher.set_poly1305_key(&[0x5a; 32]).unwrap();
    cipher.set_aad(AAD).unwrap();
    cipher
}

fn assert_detects_every_bit_flip(mut cipher: Cipher) {
    let plaintext = b"integrity protected payload";
    let ct = cipher.encrypt(plaintext).unwrap();
    let tag = cipher.get_tag(16).unwrap();

    for i in 0..ct.len() {
        for bit in [0x01u8, 0x80] {
            let mut tampered = ct.clone();
            tampered[i] ^= bit;
            cipher.set_tag(&tag).unwrap();
            let err = cipher.decrypt(&tampered).unwrap_err();
            assert_eq!(err, CryptoError::AuthenticationFailed);
            assert!(err.is_bad_decryption());
        }
    }

    for i in 0..tag.len() {
        let mut bad = tag.clone();
        bad[i] ^= 0x40;
        cipher.set_tag(&bad).unwrap();
        assert_eq!(cipher.decrypt(&ct), Err(CryptoError::AuthenticationFailed));
    }

    for i in 0..AAD.len() {
        for bit in 0..8 {
            let mut aad = AAD.to_vec();
            aad[i] ^= 1 << bit;
            cipher.set_aad(&aad).unwrap();
            cipher.set_tag(&tag).unwrap();
            assert_eq!(cipher.decrypt(&ct), Err(CryptoError::AuthenticationFailed));
        }
    }

    // 截断或加长的AAD同样被拒绝
    for aad in [&AAD[..AAD.len() - 1], &b"header\0"[..]] {
        cipher.set_aad(aad).unwrap();
        cipher.set_tag(&tag).unwrap();
        assert_eq!(cipher.decrypt(&ct), Err(CryptoError::AuthenticationFailed));
    }

    cipher.set_aad(AAD).unwrap();
    cipher.set_tag(&tag).unwrap();
    assert_eq!(cipher.decrypt(&ct).unwrap(), plaintext.to_vec());
}

#[test]
fn test_gcm_detects_tampering() {
    assert_detects_every_bit_flip(gcm());
}

#[test]
fn test_chacha20_poly1305_detects_tampering() {
    assert_detects_every_bit_flip(chacha());
}

#[test]
fn test_explicit_poly1305_key_detects_tampering() {
    for engine in [Engine::Accelerated, Engine::Portable] {
        assert_detects_every_bit_flip(ctr_with_poly1305_key(engine));
    }
}

#[test]
fn test_truncated_ciphertext_fails() {
    let mut cipher = gcm();
    let ct = cipher.encrypt(b"do not truncate me").unwrap();
    let tag = cipher.get_tag(16).unwrap();
    cipher.set_tag(&tag).unwrap();
    assert_eq!(
        cipher.decrypt(&ct[..ct.len() - 1]),
        Err(CryptoError::AuthenticationFailed)
    );
}

#[test]
fn test_tag_is_required_and_single_use() {
    let mut cipher = chacha();
    let ct = cipher.encrypt(b"payload").unwrap();
    assert!(matches!(
        cipher.decrypt(&ct),
        Err(CryptoError::InsufficientSetup(_))
    ));
    let tag = cipher.get_tag(16).unwrap();
    cipher.set_tag(&tag).unwrap();
    assert!(cipher.decrypt(&ct).is_ok());
    assert!(matches!(
        cipher.decrypt(&ct),
        Err(CryptoError::InsufficientSetup(_))
    ));
}
