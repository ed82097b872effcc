// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use blockwise::{Algorithm, Cipher, CipherConfig, CryptoError, Engine, HashAlgorithm, Mode};

#[test]
fn test_config_from_json_drives_session() {
    let config = CipherConfig::from_json(
        r#"{
            "preferred_engine": "portable",
            "continuous_buffer": true,
            "kdf": { "hash": "sm3", "iterations": 5 }
        }"#,
    )
    .unwrap();
    assert!(config.padding);
    assert_eq!(config.kdf.hash, HashAlgorithm::Sm3);
    assert_eq!(config.kdf.salt, b"blockwise/salt".to_vec());

    let mut cipher = Cipher::with_config(Algorithm::Sm4, Mode::Ctr, &config).unwrap();
    assert_eq!(cipher.engine(), Engine::Portable);
    assert_eq!(cipher.kdf_params().iterations, 5);
    assert_eq!(cipher.kdf_params().hash, HashAlgorithm::Sm3);

    cipher.set_key(&[9u8; 16]).unwrap();
    cipher.set_iv(&[0u8; 16]).unwrap();
    let first = cipher.encrypt(b"0123456789").unwrap();
    let second = cipher.encrypt(b"0123456789").unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_config_round_trip_and_errors() {
    let config = CipherConfig::new()
        .with_preferred_engine(Engine::FastPath)
        .with_padding(false);
    let json = config.to_json().unwrap();
    assert!(json.contains("\"fastpath\""));
    assert_eq!(CipherConfig::from_json(&json).unwrap(), config);

    assert!(matches!(
        CipherConfig::from_json(r#"{ "preferred_engine": "gpu" }"#),
        Err(CryptoError::InvalidParameter(_))
    ));
}

#[test]
fn test_config_padding_off() {
    let config = CipherConfig::new().with_padding(false);
    let mut cipher = Cipher::with_config(Algorithm::Aes, Mode::Ecb, &config).unwrap();
    cipher.set_key(&[0u8; 16]).unwrap();
    assert!(matches!(
        cipher.encrypt(b"not aligned"),
        Err(CryptoError::InvalidLength(_))
    ));
    assert_eq!(cipher.encrypt(&[0u8; 32]).unwrap().len(), 32);
}
