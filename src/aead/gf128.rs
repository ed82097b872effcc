// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use zeroize::Zeroize;

/// GF(2^128) with the GCM polynomial x^128 + x^7 + x^2 + x + 1.
///
/// Elements use the GCM bit order: the first bit of the 16-byte block is the
/// coefficient of x^0, which is the most significant bit of the big-endian
/// `u128`.
pub struct Gf128Field {
    reduction: u128,
}

/// Process-wide field context.
pub static GF128: Lazy<Gf128Field> = Lazy::new(|| Gf128Field {
    reduction: 0xE1 << 120,
});

impl Gf128Field {
    /// Multiplies two elements without data-dependent branches.
    pub fn mul(&self, x: u128, y: u128) -> u128 {
        let mut z = 0u128;
        let mut v = y;
        for i in 0..128 {
            let bit = (x >> (127 - i)) & 1;
            z ^= v & 0u128.wrapping_sub(bit);
            let carry = v & 1;
            v = (v >> 1) ^ (self.reduction & 0u128.wrapping_sub(carry));
        }
        z
    }
}

/// Incremental GHASH keyed with the subkey `h`.
#[derive(Clone)]
pub struct Ghash {
    h: u128,
    y: u128,
}

impl Ghash {
    pub fn new(h: &[u8; 16]) -> Self {
        Self {
            h: u128::from_be_bytes(*h),
            y: 0,
        }
    }

    /// Absorbs one 16-byte block.
    pub fn update_block(&mut self, block: &[u8; 16]) {
        self.y = GF128.mul(self.y ^ u128::from_be_bytes(*block), self.h);
    }

    /// Absorbs `data`, zero-padding the last partial block.
    pub fn update_padded(&mut self, data: &[u8]) {
        for chunk in data.chunks(16) {
            let mut block = [0u8; 16];
            block[..chunk.len()].copy_from_slice(chunk);
            self.update_block(&block);
        }
    }

    pub fn finalize(mut self) -> [u8; 16] {
        let out = self.y.to_be_bytes();
        self.zeroize_state();
        out
    }

    fn zeroize_state(&mut self) {
        self.h.zeroize();
        self.y.zeroize();
    }
}

impl Drop for Ghash {
    fn drop(&mut self) {
        self.zeroize_state();
    }
}
