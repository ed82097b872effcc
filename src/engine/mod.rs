// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Execution engines and the policy that picks one for a session.

pub mod accelerated;
pub mod fastpath;
pub mod registry;

pub use registry::{EngineRegistry, REGISTRY};

use crate::error::CryptoError;
use crate::primitive::{AesPrimitive, BlockPrimitive, Sm4Primitive};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 执行引擎
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    /// Library crates with native mode support (`ctr`, `aes-gcm`, `ghash`, `poly1305`)
    Accelerated,
    /// Batched raw-block calls; ECB natively, CTR emulated over counter blocks
    AcceleratedEcb,
    /// Mode kernels monomorphized per (cipher, mode)
    #[serde(rename = "fastpath")]
    FastPath,
    /// Generic mode engine over `dyn BlockPrimitive`
    Portable,
}

impl Engine {
    /// Preference order used when no preferred engine applies.
    pub const DEFAULT_ORDER: [Engine; 4] = [
        Engine::Accelerated,
        Engine::AcceleratedEcb,
        Engine::FastPath,
        Engine::Portable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Accelerated => "accelerated",
            Engine::AcceleratedEcb => "accelerated-ecb",
            Engine::FastPath => "fastpath",
            Engine::Portable => "portable",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accelerated" => Ok(Engine::Accelerated),
            "accelerated-ecb" | "accelerated_ecb" => Ok(Engine::AcceleratedEcb),
            "fastpath" | "fast-path" => Ok(Engine::FastPath),
            "portable" => Ok(Engine::Portable),
            other => Err(CryptoError::InvalidParameter(format!(
                "unknown engine: {}",
                other
            ))),
        }
    }
}

/// Block primitive owned by a session.
///
/// The built-in ciphers stay concrete so the fast path and the accelerated
/// engine can reach their types; anything else is only usable through the
/// trait object.
pub(crate) enum BlockCore {
    Aes(AesPrimitive),
    Sm4(Sm4Primitive),
    Custom(Box<dyn BlockPrimitive>),
}

impl BlockCore {
    pub(crate) fn as_dyn(&self) -> &dyn BlockPrimitive {
        match self {
            BlockCore::Aes(p) => p,
            BlockCore::Sm4(p) => p,
            BlockCore::Custom(p) => p.as_ref(),
        }
    }

    pub(crate) fn as_dyn_mut(&mut self) -> &mut dyn BlockPrimitive {
        match self {
            BlockCore::Aes(p) => p,
            BlockCore::Sm4(p) => p,
            BlockCore::Custom(p) => p.as_mut(),
        }
    }
}
