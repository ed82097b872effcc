// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Shared helpers and toy primitives for the integration tests.

#![allow(dead_code)]

use blockwise::{BlockPrimitive, CryptoError, Keystream, Result, StreamPrimitive};

pub fn h(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

/// 64-bit block toy cipher. Not secure; exercises the generic engine
/// with a block size other than 16.
#[derive(Default)]
pub struct Toy64 {
    key: Option<[u8; 8]>,
}

impl BlockPrimitive for Toy64 {
    fn name(&self) -> &'static str {
        "toy64"
    }

    fn block_size(&self) -> usize {
        8
    }

    fn is_valid_key_length(&self, len: usize) -> bool {
        len == 8
    }

    fn setup_key(&mut self, key: &[u8]) -> Result<()> {
        let key: [u8; 8] = key
            .try_into()
            .map_err(|_| CryptoError::InvalidLength("toy key must be 8 bytes".into()))?;
        self.key = Some(key);
        Ok(())
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        if let Some(key) = self.key {
            for (b, k) in block.iter_mut().zip(key.iter()) {
                *b = b.wrapping_add(*k) ^ 0x5c;
            }
            block.rotate_left(3);
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        if let Some(key) = self.key {
            block.rotate_right(3);
            for (b, k) in block.iter_mut().zip(key.iter()) {
                *b = (*b ^ 0x5c).wrapping_sub(*k);
            }
        }
    }
}

/// Position-keyed XOR stream; block `n` starts at byte `16 * n`.
pub struct XorStream;

struct XorKeystream {
    key: Vec<u8>,
    pos: u64,
}

impl Keystream for XorKeystream {
    fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            let k = self.key[(self.pos % self.key.len() as u64) as usize];
            *byte ^= k ^ (self.pos as u8);
            self.pos += 1;
        }
    }
}

impl StreamPrimitive for XorStream {
    fn name(&self) -> &'static str {
        "xor-stream"
    }

    fn is_valid_key_length(&self, len: usize) -> bool {
        len == 16
    }

    fn nonce_length(&self) -> Option<usize> {
        None
    }

    fn keystream(&self, key: &[u8], _nonce: &[u8], block: u64) -> Result<Box<dyn Keystream>> {
        Ok(Box::new(XorKeystream {
            key: key.to_vec(),
            pos: block * 16,
        }))
    }
}
