// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CryptoError;

/// Built-in cipher algorithms.
///
/// Custom primitives are plugged in through
/// [`Cipher::with_block_primitive`](crate::Cipher::with_block_primitive) and
/// do not need a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    // Block ciphers
    Aes,
    Sm4,

    // Stream ciphers
    ChaCha20,
}

impl Algorithm {
    /// Name used for engine capability lookup.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Aes => "aes",
            Algorithm::Sm4 => "sm4",
            Algorithm::ChaCha20 => "chacha20",
        }
    }

    pub fn is_block_cipher(&self) -> bool {
        matches!(self, Algorithm::Aes | Algorithm::Sm4)
    }

    /// Key size in bytes used until a key or explicit key length is set.
    pub fn default_key_size(&self) -> usize {
        match self {
            Algorithm::Aes => 16,
            Algorithm::Sm4 => 16,
            Algorithm::ChaCha20 => 32,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Aes => "AES",
            Self::Sm4 => "SM4",
            Self::ChaCha20 => "ChaCha20",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aes" | "rijndael" => Ok(Algorithm::Aes),
            "sm4" => Ok(Algorithm::Sm4),
            "chacha20" => Ok(Algorithm::ChaCha20),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Direction of a cipher operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Encrypt,
    Decrypt,
}
