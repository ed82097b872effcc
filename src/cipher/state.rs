// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Chaining state of one direction.
///
/// Taken by value by the mode engine and handed back when the call is done,
/// so a failed call never leaves a half-updated state behind.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct ChainState {
    /// IV, counter, CFB shift register or last OFB output block
    pub register: Vec<u8>,
    /// Unused CTR/OFB keystream bytes, next byte first
    pub keystream: Vec<u8>,
    /// CFB byte position inside `register`
    pub pos: usize,
}

impl ChainState {
    pub fn new(iv: &[u8]) -> Self {
        Self {
            register: iv.to_vec(),
            keystream: Vec::new(),
            pos: 0,
        }
    }
}

impl std::fmt::Debug for ChainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainState")
            .field("register_len", &self.register.len())
            .field("buffered", &self.keystream.len())
            .field("pos", &self.pos)
            .finish()
    }
}
