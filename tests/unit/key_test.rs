// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::common::h;
use blockwise::key::derive_key;
use blockwise::{Algorithm, Cipher, CryptoError, HashAlgorithm, KdfParams, Mode, PasswordMethod};

fn params(iterations: u32) -> KdfParams {
    KdfParams::default()
        .with_hash(HashAlgorithm::Sha256)
        .with_salt(b"salt")
        .with_iterations(iterations)
}

#[test]
fn test_pbkdf2_sha256_vector() {
    let secret = derive_key("password", &PasswordMethod::Pbkdf2(params(1)), 32, None).unwrap();
    assert_eq!(
        secret.key.as_slice(),
        h("120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b").as_slice()
    );
    assert!(secret.iv.is_none());
}

#[test]
fn test_set_password_uses_session_key_length() {
    let mut derived = Cipher::new(Algorithm::Aes, Mode::Ecb).unwrap();
    derived.set_key_length(256).unwrap();
    derived
        .set_password("password", PasswordMethod::Pbkdf2(params(1)))
        .unwrap();
    assert_eq!(derived.key_length(), 256);

    let mut explicit = Cipher::new(Algorithm::Aes, Mode::Ecb).unwrap();
    explicit
        .set_key(&h("120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"))
        .unwrap();
    assert_eq!(
        derived.encrypt(b"password based").unwrap(),
        explicit.encrypt(b"password based").unwrap()
    );
}

#[test]
fn test_pbkdf1_splits_key_and_iv() {
    let mut derived = Cipher::new(Algorithm::Aes, Mode::Cbc).unwrap();
    derived
        .set_password("password", PasswordMethod::Pbkdf1(params(1)))
        .unwrap();

    // 单次迭代: T1 = H(P || S)
    let t1 = HashAlgorithm::Sha256.digest(b"passwordsalt");
    let mut explicit = Cipher::new(Algorithm::Aes, Mode::Cbc).unwrap();
    explicit.set_key(&t1[..16]).unwrap();
    explicit.set_iv(&t1[16..32]).unwrap();
    assert_eq!(
        derived.encrypt(b"pbkdf1 message").unwrap(),
        explicit.encrypt(b"pbkdf1 message").unwrap()
    );

    // 256位密钥加IV超过了SHA-256的输出长度
    let mut too_long = Cipher::new(Algorithm::Aes, Mode::Cbc).unwrap();
    too_long.set_key_length(256).unwrap();
    assert!(matches!(
        too_long.set_password("password", PasswordMethod::Pbkdf1(params(1))),
        Err(CryptoError::InvalidLength(_))
    ));
}

#[test]
fn test_pkcs12_derives_distinct_key_and_iv() {
    let secret = derive_key("password", &PasswordMethod::Pkcs12(params(3)), 16, Some(16)).unwrap();
    let iv = secret.iv.as_ref().unwrap();
    assert_eq!(secret.key.len(), 16);
    assert_eq!(iv.len(), 16);
    assert_ne!(secret.key.as_slice(), iv.as_slice());

    let mut sm4 = Cipher::new(Algorithm::Sm4, Mode::Ofb).unwrap();
    sm4.set_password("password", PasswordMethod::Pkcs12(params(3)))
        .unwrap();
    let ct = sm4.encrypt(b"no iv was set by hand").unwrap();
    assert_eq!(sm4.decrypt(&ct).unwrap(), b"no iv was set by hand");
}

#[test]
fn test_password_method_names() {
    assert!(matches!(
        PasswordMethod::from_name("PBKDF2", params(1)),
        Ok(PasswordMethod::Pbkdf2(_))
    ));
    assert!(matches!(
        PasswordMethod::from_name("bcrypt", params(1)),
        Err(CryptoError::UnsupportedAlgorithm(_))
    ));
    assert!(matches!(
        derive_key("pw", &PasswordMethod::Pbkdf2(params(0)), 16, None),
        Err(CryptoError::InvalidParameter(_))
    ));
}
