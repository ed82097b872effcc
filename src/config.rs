// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 会话配置
//!
//! Defaults applied by [`Cipher::with_config`](crate::Cipher::with_config).

use crate::engine::Engine;
use crate::error::Result;
use crate::hash::HashAlgorithm;
use serde::{Deserialize, Serialize};

/// Defaults for `set_password` when the caller does not override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfDefaults {
    pub hash: HashAlgorithm,
    pub salt: Vec<u8>,
    pub iterations: u32,
}

impl Default for KdfDefaults {
    fn default() -> Self {
        Self {
            hash: HashAlgorithm::Sha256,
            salt: b"blockwise/salt".to_vec(),
            iterations: 1000,
        }
    }
}

/// 加密会话配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    /// 优先尝试的执行引擎
    pub preferred_engine: Option<Engine>,
    /// PKCS#7 padding for ECB and CBC
    pub padding: bool,
    /// Keep chaining state across calls
    pub continuous_buffer: bool,
    pub kdf: KdfDefaults,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            preferred_engine: None,
            padding: true,
            continuous_buffer: false,
            kdf: KdfDefaults::default(),
        }
    }
}

impl CipherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_preferred_engine(mut self, engine: Engine) -> Self {
        self.preferred_engine = Some(engine);
        self
    }

    pub fn with_padding(mut self, enabled: bool) -> Self {
        self.padding = enabled;
        self
    }

    pub fn with_continuous_buffer(mut self, enabled: bool) -> Self {
        self.continuous_buffer = enabled;
        self
    }

    pub fn with_kdf(mut self, kdf: KdfDefaults) -> Self {
        self.kdf = kdf;
        self
    }
}
