// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use blockwise::{Algorithm, Cipher, Engine, Mode};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct CavpTestVector {
    pub algorithm: String,
    pub key: String,
    pub iv: String,
    pub pt: String,
    pub aad: String,
    pub ct: String,
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub struct CavpTestSuite {
    pub name: String,
    pub vectors: Vec<CavpTestVector>,
}

pub fn load_suite(file_path: &str) -> Result<CavpTestSuite, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Runs every GCM vector of the suite on `engine` (falling back per session
/// when the engine cannot run a vector) and returns how many ran.
pub fn run_gcm_cavp_tests(
    file_path: &str,
    engine: Engine,
) -> Result<usize, Box<dyn std::error::Error>> {
    let suite = load_suite(file_path)?;
    println!("Running CAVP Test Suite: {} on {}", suite.name, engine);

    let mut count = 0;
    for (i, v) in suite.vectors.iter().enumerate() {
        let algorithm = match v.algorithm.as_str() {
            "AES-128-GCM" | "AES-192-GCM" | "AES-256-GCM" => Algorithm::Aes,
            "SM4-GCM" => Algorithm::Sm4,
            _ => continue,
        };

        let key = hex::decode(&v.key)?;
        let iv = hex::decode(&v.iv)?;
        let pt = hex::decode(&v.pt)?;
        let aad = hex::decode(&v.aad)?;
        let expected_ct = hex::decode(&v.ct)?;
        let expected_tag = hex::decode(&v.tag)?;

        let mut cipher = Cipher::new(algorithm, Mode::Gcm)?;
        cipher.set_preferred_engine(engine);
        cipher.set_key(&key)?;
        cipher.set_nonce(&iv)?;
        cipher.set_aad(&aad)?;

        // 验证加密
        let ct = cipher.encrypt(&pt)?;
        assert_eq!(ct, expected_ct, "Ciphertext mismatch at vector {}", i);
        assert_eq!(
            cipher.get_tag(16)?,
            expected_tag,
            "Tag mismatch at vector {}",
            i
        );

        // 验证解密
        cipher.set_tag(&expected_tag)?;
        let decrypted = cipher.decrypt(&expected_ct)?;
        assert_eq!(decrypted, pt, "Decryption mismatch at vector {}", i);

        println!("  Vector {} ({}): Passed on {}", i, v.algorithm, cipher.engine());
        count += 1;
    }
    Ok(count)
}
