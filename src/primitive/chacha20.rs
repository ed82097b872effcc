// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::error::{CryptoError, Result};
use crate::primitive::{Keystream, StreamPrimitive};
use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::ChaCha20;
use zeroize::Zeroizing;

const CHACHA20_BLOCK_SIZE: u64 = 64;

/// ChaCha20 (RFC 8439, 96-bit nonce) stream primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaCha20Primitive;

impl ChaCha20Primitive {
    pub fn new() -> Self {
        Self
    }

    fn init(key: &[u8], nonce: &[u8]) -> Result<ChaCha20> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidLength(
                "Invalid ChaCha20 key length, must be 256 bits".into(),
            ));
        }
        if nonce.len() != 12 {
            return Err(CryptoError::InvalidLength(
                "Invalid ChaCha20 nonce length, must be 12 bytes".into(),
            ));
        }
        ChaCha20::new_from_slices(key, nonce)
            .map_err(|e| CryptoError::InternalError(format!("ChaCha20 init: {}", e)))
    }
}

struct ChaCha20Keystream(ChaCha20);

impl Keystream for ChaCha20Keystream {
    fn apply_keystream(&mut self, data: &mut [u8]) {
        self.0.apply_keystream(data);
    }
}

impl StreamPrimitive for ChaCha20Primitive {
    fn name(&self) -> &'static str {
        "chacha20"
    }

    fn is_valid_key_length(&self, len: usize) -> bool {
        len == 32
    }

    fn nonce_length(&self) -> Option<usize> {
        Some(12)
    }

    fn keystream(&self, key: &[u8], nonce: &[u8], block: u64) -> Result<Box<dyn Keystream>> {
        let mut cipher = Self::init(key, nonce)?;
        cipher.seek(block * CHACHA20_BLOCK_SIZE);
        Ok(Box::new(ChaCha20Keystream(cipher)))
    }

    fn poly1305_key(&self, key: &[u8], nonce: &[u8]) -> Result<Option<Zeroizing<[u8; 32]>>> {
        let mut cipher = Self::init(key, nonce)?;
        let mut otk = Zeroizing::new([0u8; 32]);
        cipher.apply_keystream(otk.as_mut());
        Ok(Some(otk))
    }
}
