// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Per-cipher primitive capabilities.
//!
//! The mode engine never implements a cipher itself. It drives a
//! [`BlockPrimitive`] (one block in, one block out, plus a key schedule) or,
//! for [`Mode::Stream`](crate::Mode::Stream), a [`StreamPrimitive`] that owns
//! its own keystream state.

pub mod aes;
pub mod chacha20;
pub mod sm4;

pub use self::aes::AesPrimitive;
pub use self::chacha20::ChaCha20Primitive;
pub use self::sm4::Sm4Primitive;

use crate::error::Result;
use zeroize::Zeroizing;

/// Block cipher capability.
pub trait BlockPrimitive: Send + Sync {
    /// Name used for engine capability lookup.
    fn name(&self) -> &'static str;

    /// Block size in bytes.
    fn block_size(&self) -> usize;

    fn is_valid_key_length(&self, len: usize) -> bool;

    /// Expands `key` into the internal key schedule.
    fn setup_key(&mut self, key: &[u8]) -> Result<()>;

    /// Encrypts one block in place. `block.len()` equals [`block_size`](Self::block_size).
    fn encrypt_block(&self, block: &mut [u8]);

    /// Decrypts one block in place.
    fn decrypt_block(&self, block: &mut [u8]);

    /// Encrypts consecutive blocks in place.
    ///
    /// Implementations backed by a library with a batched interface should
    /// override this; the default walks the blocks one by one.
    fn encrypt_blocks(&self, blocks: &mut [u8]) {
        let block_size = self.block_size();
        for block in blocks.chunks_exact_mut(block_size) {
            self.encrypt_block(block);
        }
    }

    /// Decrypts consecutive blocks in place.
    fn decrypt_blocks(&self, blocks: &mut [u8]) {
        let block_size = self.block_size();
        for block in blocks.chunks_exact_mut(block_size) {
            self.decrypt_block(block);
        }
    }
}

/// Running keystream of a stream cipher.
pub trait Keystream: Send {
    /// XORs the next `data.len()` keystream bytes into `data`.
    fn apply_keystream(&mut self, data: &mut [u8]);
}

/// Stream cipher capability.
pub trait StreamPrimitive: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_valid_key_length(&self, len: usize) -> bool;

    /// Required nonce length, or `None` if the cipher takes no nonce.
    fn nonce_length(&self) -> Option<usize>;

    /// Starts a keystream at the given internal block counter.
    fn keystream(&self, key: &[u8], nonce: &[u8], block: u64) -> Result<Box<dyn Keystream>>;

    /// One-time Poly1305 key derived from the keystream (RFC 8439 style).
    ///
    /// When this returns a key, data encryption starts at block 1.
    fn poly1305_key(&self, _key: &[u8], _nonce: &[u8]) -> Result<Option<Zeroizing<[u8; 32]>>> {
        Ok(None)
    }
}
