// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Prime field 2^130 - 5 in three limbs of 44, 44 and 42 bits.
pub struct Poly1305Field {
    limb_mask: [u64; 3],
    clamp: [u64; 3],
}

/// Process-wide field context.
pub static POLY1305_FIELD: Lazy<Poly1305Field> = Lazy::new(|| Poly1305Field {
    limb_mask: [0xfffffffffff, 0xfffffffffff, 0x3ffffffffff],
    clamp: [0xffc0fffffff, 0xfffffc0ffff, 0x00ffffffc0f],
});

impl Poly1305Field {
    fn split(&self, lo: u64, hi: u64) -> [u64; 3] {
        [
            lo & self.limb_mask[0],
            ((lo >> 44) | (hi << 20)) & self.limb_mask[1],
            (hi >> 24) & self.limb_mask[2],
        ]
    }
}

/// Poly1305 one-time authenticator (RFC 8439).
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Poly1305 {
    r: [u64; 3],
    h: [u64; 3],
    pad: [u64; 2],
    buffer: [u8; 16],
    leftover: usize,
}

fn le64(bytes: &[u8]) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(b)
}

impl Poly1305 {
    /// `key` is `r ‖ s`; `r` is clamped here.
    pub fn new(key: &[u8; 32]) -> Self {
        let field = &*POLY1305_FIELD;
        let t0 = le64(&key[0..8]);
        let t1 = le64(&key[8..16]);
        let r = [
            t0 & field.clamp[0],
            ((t0 >> 44) | (t1 << 20)) & field.clamp[1],
            (t1 >> 24) & field.clamp[2],
        ];
        Self {
            r,
            h: [0; 3],
            pad: [le64(&key[16..24]), le64(&key[24..32])],
            buffer: [0; 16],
            leftover: 0,
        }
    }

    fn block(&mut self, m: &[u8; 16], hibit: u64) {
        let field = &*POLY1305_FIELD;
        let [m44, _, m42] = field.limb_mask;
        let [r0, r1, r2] = self.r;
        let s1 = r1 * (5 << 2);
        let s2 = r2 * (5 << 2);

        let limbs = field.split(le64(&m[0..8]), le64(&m[8..16]));
        let h0 = self.h[0] + limbs[0];
        let h1 = self.h[1] + limbs[1];
        let h2 = self.h[2] + (limbs[2] | hibit);

        let d0 = h0 as u128 * r0 as u128 + h1 as u128 * s2 as u128 + h2 as u128 * s1 as u128;
        let mut d1 = h0 as u128 * r1 as u128 + h1 as u128 * r0 as u128 + h2 as u128 * s2 as u128;
        let mut d2 = h0 as u128 * r2 as u128 + h1 as u128 * r1 as u128 + h2 as u128 * r0 as u128;

        let mut c = (d0 >> 44) as u64;
        let mut h0 = d0 as u64 & m44;
        d1 += c as u128;
        c = (d1 >> 44) as u64;
        let h1 = d1 as u64 & m44;
        d2 += c as u128;
        c = (d2 >> 42) as u64;
        let h2 = d2 as u64 & m42;
        h0 += c * 5;
        c = h0 >> 44;
        h0 &= m44;

        self.h = [h0, h1 + c, h2];
    }

    pub fn update(&mut self, mut data: &[u8]) {
        if self.leftover > 0 {
            let take = (16 - self.leftover).min(data.len());
            self.buffer[self.leftover..self.leftover + take].copy_from_slice(&data[..take]);
            self.leftover += take;
            data = &data[take..];
            if self.leftover < 16 {
                return;
            }
            let buffer = self.buffer;
            self.block(&buffer, 1 << 40);
            self.leftover = 0;
        }

        let mut chunks = data.chunks_exact(16);
        for chunk in &mut chunks {
            let mut m = [0u8; 16];
            m.copy_from_slice(chunk);
            self.block(&m, 1 << 40);
        }
        let rest = chunks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.leftover = rest.len();
    }

    /// Absorbs `data` then zero-pads to a 16-byte boundary (RFC 8439 AEAD).
    pub fn update_padded(&mut self, data: &[u8]) {
        self.update(data);
        if self.leftover > 0 {
            let zeros = [0u8; 16];
            let fill = 16 - self.leftover;
            self.update(&zeros[..fill]);
        }
    }

    pub fn finalize(mut self) -> [u8; 16] {
        let [m44, _, m42] = POLY1305_FIELD.limb_mask;

        if self.leftover > 0 {
            let mut m = [0u8; 16];
            m[..self.leftover].copy_from_slice(&self.buffer[..self.leftover]);
            m[self.leftover] = 1;
            self.block(&m, 0);
        }

        let [mut h0, mut h1, mut h2] = self.h;
        let mut c = h1 >> 44;
        h1 &= m44;
        h2 += c;
        c = h2 >> 42;
        h2 &= m42;
        h0 += c * 5;
        c = h0 >> 44;
        h0 &= m44;
        h1 += c;
        c = h1 >> 44;
        h1 &= m44;
        h2 += c;
        c = h2 >> 42;
        h2 &= m42;
        h0 += c * 5;
        c = h0 >> 44;
        h0 &= m44;
        h1 += c;

        // g = h + 5 - 2^130, selected when non-negative
        let mut g0 = h0 + 5;
        c = g0 >> 44;
        g0 &= m44;
        let mut g1 = h1 + c;
        c = g1 >> 44;
        g1 &= m44;
        let mut g2 = (h2 + c).wrapping_sub(1 << 42);

        let select = (g2 >> 63).wrapping_sub(1);
        g0 &= select;
        g1 &= select;
        g2 &= select;
        h0 = (h0 & !select) | g0;
        h1 = (h1 & !select) | g1;
        h2 = (h2 & !select) | g2;

        let t0 = self.pad[0];
        let t1 = self.pad[1];
        h0 += t0 & m44;
        c = h0 >> 44;
        h0 &= m44;
        h1 += (((t0 >> 44) | (t1 << 20)) & m44) + c;
        c = h1 >> 44;
        h1 &= m44;
        h2 += ((t1 >> 24) & m42) + c;
        h2 &= m42;

        let lo = h0 | (h1 << 44);
        let hi = (h1 >> 20) | (h2 << 24);
        let mut tag = [0u8; 16];
        tag[..8].copy_from_slice(&lo.to_le_bytes());
        tag[8..].copy_from_slice(&hi.to_le_bytes());
        tag
    }
}

/// One-shot MAC.
pub fn poly1305_mac(key: &[u8; 32], data: &[u8]) -> [u8; 16] {
    let mut mac = Poly1305::new(key);
    mac.update(data);
    mac.finalize()
}
