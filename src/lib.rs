// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Blockwise Cipher Engine
//!
//! Block cipher modes of operation (ECB, CBC, CTR, CFB, CFB8, OFB, GCM) and
//! stream ciphers behind one session type, [`Cipher`], with optional
//! Poly1305 authentication and several execution engines picked per session.

pub mod aead;
pub mod cipher;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod key;
pub mod primitive;
pub mod side_channel;
pub mod types;

pub use cipher::{Cipher, Mode};
pub use config::{CipherConfig, KdfDefaults};
pub use engine::Engine;
pub use error::{CryptoError, Result};
pub use hash::HashAlgorithm;
pub use key::{KdfParams, PasswordMethod};
pub use primitive::{
    AesPrimitive, BlockPrimitive, ChaCha20Primitive, Keystream, Sm4Primitive, StreamPrimitive,
};
pub use types::{Algorithm, Direction};
