// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! GCM building blocks (NIST SP 800-38D) over any 16-byte block primitive.
//!
//! The data path itself is counter mode with a 32-bit increment and is run
//! by the mode engine; this module only derives `H`, `J0` and the tag.

use crate::aead::gf128::Ghash;
use crate::primitive::BlockPrimitive;

pub const GCM_BLOCK_SIZE: usize = 16;

/// Hash subkey `H = E_K(0^128)`.
pub fn hash_subkey<P: BlockPrimitive + ?Sized>(prim: &P) -> [u8; 16] {
    let mut h = [0u8; 16];
    prim.encrypt_block(&mut h);
    h
}

/// Pre-counter block `J0`.
pub fn pre_counter_block(h: &[u8; 16], nonce: &[u8]) -> [u8; 16] {
    if nonce.len() == 12 {
        let mut j0 = [0u8; 16];
        j0[..12].copy_from_slice(nonce);
        j0[15] = 1;
        return j0;
    }

    let mut ghash = Ghash::new(h);
    ghash.update_padded(nonce);
    ghash.update_block(&length_block(0, nonce.len()));
    ghash.finalize()
}

/// Increments the rightmost 32 bits of `block` modulo 2^32.
pub fn inc32(block: &mut [u8]) {
    let n = block.len();
    let mut ctr = [0u8; 4];
    ctr.copy_from_slice(&block[n - 4..]);
    let next = u32::from_be_bytes(ctr).wrapping_add(1);
    block[n - 4..].copy_from_slice(&next.to_be_bytes());
}

/// `len64(A) ‖ len64(C)` in bits.
pub fn length_block(aad_len: usize, ct_len: usize) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..8].copy_from_slice(&((aad_len as u64) * 8).to_be_bytes());
    block[8..].copy_from_slice(&((ct_len as u64) * 8).to_be_bytes());
    block
}

/// `GHASH(pad(A) ‖ pad(C) ‖ len64(A) ‖ len64(C))`.
pub fn ghash_aad_ciphertext(h: &[u8; 16], aad: &[u8], ciphertext: &[u8]) -> [u8; 16] {
    let mut ghash = Ghash::new(h);
    ghash.update_padded(aad);
    ghash.update_padded(ciphertext);
    ghash.update_block(&length_block(aad.len(), ciphertext.len()));
    ghash.finalize()
}

/// Full tag `E_K(J0) ⊕ S`.
pub fn finish_tag<P: BlockPrimitive + ?Sized>(prim: &P, j0: &[u8; 16], s: &[u8; 16]) -> [u8; 16] {
    let mut tag = *j0;
    prim.encrypt_block(&mut tag);
    for (t, x) in tag.iter_mut().zip(s.iter()) {
        *t ^= x;
    }
    tag
}
