// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Hash functions available to the password-based key derivations.

use crate::error::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "sha224")]
    Sha224,
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "sha384")]
    Sha384,
    #[serde(rename = "sha512")]
    Sha512,
    #[serde(rename = "sha512/224")]
    Sha512_224,
    #[serde(rename = "sha512/256")]
    Sha512_256,
    #[serde(rename = "sm3")]
    Sm3,
}

fn digest_with<D: Digest>(data: &[u8]) -> Vec<u8> {
    D::digest(data).to_vec()
}

impl HashAlgorithm {
    /// Looks a hash up by name; dashes and case are ignored.
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "sha512/224" | "sha512_224" => Ok(HashAlgorithm::Sha512_224),
            "sha512/256" | "sha512_256" => Ok(HashAlgorithm::Sha512_256),
            "sm3" => Ok(HashAlgorithm::Sm3),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "unknown hash: {}",
                name
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sha512_224 => "sha512/224",
            HashAlgorithm::Sha512_256 => "sha512/256",
            HashAlgorithm::Sm3 => "sm3",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha224 | HashAlgorithm::Sha512_224 => 28,
            HashAlgorithm::Sha256 | HashAlgorithm::Sha512_256 | HashAlgorithm::Sm3 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Input block length in bytes.
    pub fn block_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha224 | HashAlgorithm::Sha256 | HashAlgorithm::Sm3 => 64,
            _ => 128,
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha224 => digest_with::<sha2::Sha224>(data),
            HashAlgorithm::Sha256 => digest_with::<sha2::Sha256>(data),
            HashAlgorithm::Sha384 => digest_with::<sha2::Sha384>(data),
            HashAlgorithm::Sha512 => digest_with::<sha2::Sha512>(data),
            HashAlgorithm::Sha512_224 => digest_with::<sha2::Sha512_224>(data),
            HashAlgorithm::Sha512_256 => digest_with::<sha2::Sha512_256>(data),
            HashAlgorithm::Sm3 => digest_with::<sm3::Sm3>(data),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}
