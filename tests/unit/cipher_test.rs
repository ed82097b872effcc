// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::common::{h, Toy64, XorStream};
use blockwise::{Algorithm, Cipher, CryptoError, Engine, Mode};

const KEY_128: &str = "2b7e151628aed2a6abf7158809cf4f3c";
const IV: &str = "000102030405060708090a0b0c0d0e0f";
const CTR_IV: &str = "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff";
const PLAINTEXT: &str = "6bc1bee22e409f96e93d7e117393172a\
                         ae2d8a571e03ac9c9eb76fac45af8e51\
                         30c81c46a35ce411e5fbc1191a0a52ef\
                         f69f2445df4f9b17ad2b417be66c3710";

/// SP 800-38A F.1 - F.5, AES-128.
const VECTORS: [(Mode, &str, &str); 6] = [
    (
        Mode::Ecb,
        "",
        "3ad77bb40d7a3660a89ecaf32466ef97f5d3d58503b9699de785895a96fdbaaf\
         43b1cd7f598ece23881b00e3ed0306887b0c785e27e8ad3f8223207104725dd4",
    ),
    (
        Mode::Cbc,
        IV,
        "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2\
         73bed6b8e3c1743b7116e69e222295163ff1caa1681fac09120eca307586e1a7",
    ),
    (
        Mode::Cfb,
        IV,
        "3b3fd92eb72dad20333449f8e83cfb4ac8a64537a0b3a93fcde3cdad9f1ce58b\
         26751f67a3cbb140b1808cf187a4f4dfc04b05357c5d1c0eeac4c66f9ff7f2e6",
    ),
    (
        Mode::Ofb,
        IV,
        "3b3fd92eb72dad20333449f8e83cfb4a7789508d16918f03f53c52dac54ed825\
         9740051e9c5fecf64344f7a82260edcc304c6528f659c77866a510d9c1d6ae5e",
    ),
    (
        Mode::Ctr,
        CTR_IV,
        "874d6191b620e3261bef6864990db6ce9806f66b7970fdff8617187bb9fffdff\
         5ae4df3edbd5d35e5b4f09020db03eab1e031dda2fbe03d1792170a0f3009cee",
    ),
    (
        Mode::Cfb8,
        IV,
        "3b79424c9c0dd436bace9e0ed4586a4f32b9",
    ),
];

fn session(mode: Mode, iv: &str, engine: Engine) -> Cipher {
    let mut cipher = Cipher::new(Algorithm::Aes, mode).unwrap();
    cipher.set_preferred_engine(engine);
    cipher.disable_padding();
    cipher.set_key(&h(KEY_128)).unwrap();
    if !iv.is_empty() {
        cipher.set_iv(&h(iv)).unwrap();
    }
    cipher
}

#[test]
fn test_sp800_38a_vectors_on_every_engine() {
    for (mode, iv, expected) in VECTORS {
        let expected = h(expected);
        let full = h(PLAINTEXT);
        let plaintext = &full[..expected.len()];
        for engine in Engine::DEFAULT_ORDER {
            let mut cipher = session(mode, iv, engine);
            let ct = cipher.encrypt(plaintext).unwrap();
            assert_eq!(ct, expected, "{} encrypt on {}", mode, cipher.engine());
            let pt = cipher.decrypt(&ct).unwrap();
            assert_eq!(pt, plaintext, "{} decrypt on {}", mode, cipher.engine());
        }
    }
}

#[test]
fn test_aes_192_and_256_ecb() {
    let cases = [
        (
            "8e73b0f7da0e6452c810f32b809079e562f8ead2522c6b7b",
            "bd334f1d6e45f25ff712a214571fa5cc",
        ),
        (
            "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
            "f3eed1bdb5d2a03c064b5a7e3db181f8",
        ),
    ];
    for (key, expected) in cases {
        let mut cipher = Cipher::from_mode_name(Algorithm::Aes, "ECB").unwrap();
        cipher.disable_padding();
        cipher.set_key(&h(key)).unwrap();
        assert_eq!(cipher.key_length(), h(key).len() * 8);
        assert_eq!(
            cipher.encrypt(&h(PLAINTEXT)[..16]).unwrap(),
            h(expected)
        );
    }
}

#[test]
fn test_counter_wraps_around() {
    let key = h(KEY_128);
    let mut ecb = Cipher::new(Algorithm::Aes, Mode::Ecb).unwrap();
    ecb.disable_padding();
    ecb.set_key(&key).unwrap();
    let mut expected = ecb.encrypt(&[0xff; 16]).unwrap();
    expected.extend(ecb.encrypt(&[0x00; 16]).unwrap());

    for engine in Engine::DEFAULT_ORDER {
        let mut ctr = Cipher::new(Algorithm::Aes, Mode::Ctr).unwrap();
        ctr.set_preferred_engine(engine);
        ctr.set_key(&key).unwrap();
        ctr.set_iv(&[0xff; 16]).unwrap();
        assert_eq!(
            ctr.encrypt(&[0u8; 32]).unwrap(),
            expected,
            "engine {}",
            ctr.engine()
        );
    }
}

#[test]
fn test_padding_law() {
    let mut cipher = Cipher::new(Algorithm::Sm4, Mode::Cbc).unwrap();
    cipher.set_key(&[0x11; 16]).unwrap();
    cipher.set_iv(&[0x22; 16]).unwrap();
    for len in [0usize, 1, 15, 16, 17, 31, 32, 100] {
        let data = vec![0xabu8; len];
        let ct = cipher.encrypt(&data).unwrap();
        assert_eq!(ct.len(), (len / 16 + 1) * 16);
        assert_eq!(cipher.decrypt(&ct).unwrap(), data);
    }
}

#[test]
fn test_custom_block_primitive() {
    for mode in [Mode::Ecb, Mode::Cbc, Mode::Ctr, Mode::Cfb, Mode::Cfb8, Mode::Ofb] {
        let mut cipher = Cipher::with_block_primitive(Box::<Toy64>::default(), mode).unwrap();
        assert_eq!(cipher.engine(), Engine::Portable);
        assert_eq!(cipher.block_length_in_bytes(), 8);
        cipher.set_key(b"toy key!").unwrap();
        if cipher.uses_iv() {
            cipher.set_iv(&[7u8; 8]).unwrap();
        }
        let data = b"twenty-nine bytes of payload!";
        let ct = cipher.encrypt(data).unwrap();
        assert_ne!(&ct[..data.len()], &data[..]);
        assert_eq!(cipher.decrypt(&ct).unwrap(), data.to_vec(), "{}", mode);
    }

    let mut cipher = Cipher::with_block_primitive(Box::<Toy64>::default(), Mode::Cbc).unwrap();
    assert!(matches!(
        cipher.set_iv(&[0u8; 16]),
        Err(CryptoError::InvalidLength(_))
    ));
}

#[test]
fn test_custom_stream_primitive() {
    let mut cipher = Cipher::with_stream_primitive(Box::new(XorStream)).unwrap();
    assert_eq!(cipher.mode(), Mode::Stream);
    assert!(!cipher.uses_nonce());
    assert!(matches!(cipher.set_nonce(&[0u8; 12]), Err(CryptoError::BadMode(_))));
    cipher.set_key(&[0x42; 16]).unwrap();

    let data = vec![0u8; 40];
    let ct = cipher.encrypt(&data).unwrap();
    assert_eq!(cipher.decrypt(&ct).unwrap(), data);

    cipher.enable_continuous_buffer().unwrap();
    let mut split = cipher.encrypt(&data[..13]).unwrap();
    split.extend(cipher.encrypt(&data[13..]).unwrap());
    assert_eq!(split, ct);

    // 没有派生密钥的流密码需要显式的Poly1305密钥
    cipher.enable_poly1305().unwrap();
    assert!(matches!(
        cipher.encrypt(&data),
        Err(CryptoError::InsufficientSetup(_))
    ));
}

#[test]
fn test_sm4_gcm_round_trip_on_every_engine() {
    let mut reference: Option<(Vec<u8>, Vec<u8>)> = None;
    for engine in Engine::DEFAULT_ORDER {
        let mut cipher = Cipher::new(Algorithm::Sm4, Mode::Gcm).unwrap();
        cipher.set_preferred_engine(engine);
        cipher.set_key(&[0x01; 16]).unwrap();
        cipher.set_nonce(&[0x02; 12]).unwrap();
        cipher.set_aad(b"sm4 gcm").unwrap();
        let ct = cipher.encrypt(b"message spanning more than one block").unwrap();
        let tag = cipher.get_tag(16).unwrap();

        cipher.set_tag(&tag).unwrap();
        assert_eq!(
            cipher.decrypt(&ct).unwrap(),
            b"message spanning more than one block"
        );
        match &reference {
            Some((rct, rtag)) => {
                assert_eq!(&ct, rct, "engine {}", cipher.engine());
                assert_eq!(&tag, rtag, "engine {}", cipher.engine());
            }
            None => reference = Some((ct, tag)),
        }
    }
}
