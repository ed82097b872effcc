// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::cipher::mode::Mode;
use crate::engine::Engine;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

/// Cipher name matching every primitive.
const ANY_CIPHER: &str = "*";

const BLOCK_MODES: [Mode; 7] = [
    Mode::Ecb,
    Mode::Cbc,
    Mode::Ctr,
    Mode::Cfb,
    Mode::Cfb8,
    Mode::Ofb,
    Mode::Gcm,
];

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
cpufeatures::new!(cpuid_aes, "aes", "pclmulqdq");

#[cfg(target_arch = "aarch64")]
cpufeatures::new!(cpuid_aes, "aes");

#[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
fn detect_aes() -> bool {
    cpuid_aes::get()
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_aes() -> bool {
    false
}

/// CPU features relevant to engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuFeatures {
    /// AES round instructions (and carry-less multiply on x86)
    pub aes: bool,
}

impl CpuFeatures {
    pub fn detect() -> Self {
        Self { aes: detect_aes() }
    }
}

/// 引擎能力注册表
///
/// Populated once per process from what is compiled in; sessions only read it.
pub struct EngineRegistry {
    capabilities: HashMap<Engine, HashMap<&'static str, HashSet<Mode>>>,
    cpu: CpuFeatures,
}

lazy_static! {
    pub static ref REGISTRY: EngineRegistry = EngineRegistry::probe();
}

impl EngineRegistry {
    /// Registry with only the portable engine.
    pub fn new() -> Self {
        let mut registry = Self {
            capabilities: HashMap::new(),
            cpu: CpuFeatures::default(),
        };
        let mut all = BLOCK_MODES.to_vec();
        all.push(Mode::Stream);
        registry.register(Engine::Portable, ANY_CIPHER, &all);
        registry
    }

    /// Registers every engine compiled into this build.
    pub fn probe() -> Self {
        let mut registry = Self::new();
        registry.cpu = CpuFeatures::detect();

        #[cfg(feature = "accelerated")]
        {
            for cipher in ["aes", "sm4"] {
                registry.register(Engine::Accelerated, cipher, &[Mode::Ctr, Mode::Gcm]);
                registry.register(Engine::AcceleratedEcb, cipher, &[Mode::Ecb, Mode::Ctr]);
            }
            if !registry.cpu.aes {
                log::warn!("AES hardware instructions not detected; accelerated engines use the software backend");
            }
        }

        #[cfg(feature = "fastpath")]
        {
            for cipher in ["aes", "sm4"] {
                registry.register(Engine::FastPath, cipher, &BLOCK_MODES);
            }
        }

        log::debug!(
            "Engine registry populated: {:?} (cpu: {:?})",
            registry.engines(),
            registry.cpu
        );
        registry
    }

    pub fn register(&mut self, engine: Engine, cipher: &'static str, modes: &[Mode]) {
        self.capabilities
            .entry(engine)
            .or_default()
            .entry(cipher)
            .or_default()
            .extend(modes.iter().copied());
    }

    /// Whether `engine` implements `mode` for the cipher named `cipher`.
    pub fn supports(&self, engine: Engine, cipher: &str, mode: Mode) -> bool {
        let Some(ciphers) = self.capabilities.get(&engine) else {
            return false;
        };
        [cipher, ANY_CIPHER]
            .iter()
            .filter_map(|name| ciphers.get(*name))
            .any(|modes| modes.contains(&mode))
    }

    /// Registered engines, in default preference order.
    pub fn engines(&self) -> Vec<Engine> {
        Engine::DEFAULT_ORDER
            .iter()
            .copied()
            .filter(|e| self.capabilities.contains_key(e))
            .collect()
    }

    pub fn cpu_features(&self) -> CpuFeatures {
        self.cpu
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
