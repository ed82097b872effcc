// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::error::CryptoError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 加密模式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// ECB模式 - 需要PKCS#7填充
    Ecb,
    /// CBC模式 - 需要PKCS#7填充
    Cbc,
    /// CTR模式 - 不需要填充
    Ctr,
    /// Full-block cipher feedback
    Cfb,
    /// 8-bit cipher feedback
    Cfb8,
    Ofb,
    /// GCM模式 - 不需要填充
    Gcm,
    /// The primitive is a stream cipher and owns its state
    Stream,
}

impl Mode {
    /// 判断模式是否需要填充
    pub fn is_paddable(&self) -> bool {
        matches!(self, Mode::Cbc | Mode::Ecb)
    }

    /// Whether the mode chains through an IV set with `set_iv`.
    pub fn uses_iv(&self) -> bool {
        !matches!(self, Mode::Ecb | Mode::Gcm | Mode::Stream)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Mode::Gcm)
    }

    /// Modes that turn the block primitive into a keystream generator and
    /// accept input of any length.
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            Mode::Ctr | Mode::Cfb | Mode::Cfb8 | Mode::Ofb | Mode::Gcm | Mode::Stream
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Ecb => "ecb",
            Mode::Cbc => "cbc",
            Mode::Ctr => "ctr",
            Mode::Cfb => "cfb",
            Mode::Cfb8 => "cfb8",
            Mode::Ofb => "ofb",
            Mode::Gcm => "gcm",
            Mode::Stream => "stream",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ecb" => Ok(Mode::Ecb),
            "cbc" => Ok(Mode::Cbc),
            "ctr" => Ok(Mode::Ctr),
            "cfb" | "cfb128" => Ok(Mode::Cfb),
            "cfb8" => Ok(Mode::Cfb8),
            "ofb" => Ok(Mode::Ofb),
            "gcm" => Ok(Mode::Gcm),
            "stream" => Ok(Mode::Stream),
            other => Err(CryptoError::BadMode(format!("unknown mode: {}", other))),
        }
    }
}
