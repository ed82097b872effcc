// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Mode engine: block-cipher modes of operation over a [`BlockPrimitive`].
//!
//! Every function takes the direction's [`ChainState`] by value and returns
//! the state to commit next to the output. The functions are generic so the
//! fast path gets a copy per concrete primitive while the portable path runs
//! the same code through `dyn BlockPrimitive`.

use crate::aead::gcm::inc32;
use crate::cipher::mode::Mode;
use crate::cipher::state::ChainState;
use crate::error::{CryptoError, Result};
use crate::primitive::BlockPrimitive;
use crate::types::Direction;
use zeroize::Zeroize;

pub type ModeOutput = (Vec<u8>, ChainState);

/// Runs `mode` over `data`.
///
/// `batched` hands whole runs of blocks to
/// [`BlockPrimitive::encrypt_blocks`] where the mode allows it (ECB, CTR).
pub fn process<P: BlockPrimitive + ?Sized>(
    prim: &P,
    mode: Mode,
    dir: Direction,
    state: ChainState,
    data: &[u8],
    batched: bool,
) -> Result<ModeOutput> {
    match mode {
        Mode::Ecb => ecb(prim, dir, data, batched).map(|out| (out, state)),
        Mode::Cbc => cbc(prim, dir, state, data),
        Mode::Ctr => ctr(prim, state, data, batched, increment_be),
        Mode::Gcm => ctr(prim, state, data, batched, inc32),
        Mode::Cfb => cfb(prim, dir, state, data),
        Mode::Cfb8 => cfb8(prim, dir, state, data),
        Mode::Ofb => ofb(prim, state, data),
        Mode::Stream => Err(CryptoError::BadMode(
            "stream mode is driven by a stream primitive".into(),
        )),
    }
}

/// Increments `counter` as a big-endian integer, wrapping to zero.
pub fn increment_be(counter: &mut [u8]) {
    for byte in counter.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}

fn xor_in_place(data: &mut [u8], keystream: &[u8]) {
    for (d, k) in data.iter_mut().zip(keystream.iter()) {
        *d ^= k;
    }
}

fn check_block_multiple(len: usize, block_size: usize, mode: Mode) -> Result<()> {
    if len % block_size != 0 {
        return Err(CryptoError::InvalidLength(format!(
            "{} input length ({}) must be a multiple of the block size ({})",
            mode, len, block_size
        )));
    }
    Ok(())
}

fn check_register(state: &ChainState, block_size: usize) -> Result<()> {
    if state.register.len() != block_size {
        return Err(CryptoError::InternalError(format!(
            "chaining register is {} bytes, block size is {}",
            state.register.len(),
            block_size
        )));
    }
    Ok(())
}

pub fn ecb<P: BlockPrimitive + ?Sized>(
    prim: &P,
    dir: Direction,
    data: &[u8],
    batched: bool,
) -> Result<Vec<u8>> {
    let bs = prim.block_size();
    check_block_multiple(data.len(), bs, Mode::Ecb)?;

    let mut out = data.to_vec();
    match (dir, batched) {
        (Direction::Encrypt, true) => prim.encrypt_blocks(&mut out),
        (Direction::Decrypt, true) => prim.decrypt_blocks(&mut out),
        (Direction::Encrypt, false) => out
            .chunks_exact_mut(bs)
            .for_each(|block| prim.encrypt_block(block)),
        (Direction::Decrypt, false) => out
            .chunks_exact_mut(bs)
            .for_each(|block| prim.decrypt_block(block)),
    }
    Ok(out)
}

pub fn cbc<P: BlockPrimitive + ?Sized>(
    prim: &P,
    dir: Direction,
    mut state: ChainState,
    data: &[u8],
) -> Result<ModeOutput> {
    let bs = prim.block_size();
    check_block_multiple(data.len(), bs, Mode::Cbc)?;
    check_register(&state, bs)?;

    let mut out = data.to_vec();
    match dir {
        Direction::Encrypt => {
            for block in out.chunks_exact_mut(bs) {
                xor_in_place(block, &state.register);
                prim.encrypt_block(block);
                state.register.copy_from_slice(block);
            }
        }
        Direction::Decrypt => {
            // 块解密互不依赖，可以整批交给原语
            prim.decrypt_blocks(&mut out);
            for (block, cipher_block) in out.chunks_exact_mut(bs).zip(data.chunks_exact(bs)) {
                xor_in_place(block, &state.register);
                state.register.copy_from_slice(cipher_block);
            }
        }
    }
    Ok((out, state))
}

/// Counter mode; `step` advances the counter block.
pub fn ctr<P: BlockPrimitive + ?Sized>(
    prim: &P,
    mut state: ChainState,
    data: &[u8],
    batched: bool,
    step: fn(&mut [u8]),
) -> Result<ModeOutput> {
    let bs = prim.block_size();
    check_register(&state, bs)?;

    let mut out = data.to_vec();
    let buffered = state.keystream.len().min(out.len());
    xor_in_place(&mut out[..buffered], &state.keystream[..buffered]);
    state.keystream.drain(..buffered);

    let remaining = out.len() - buffered;
    if remaining == 0 {
        return Ok((out, state));
    }

    let blocks = remaining.div_ceil(bs);
    let mut keystream = Vec::with_capacity(blocks * bs);
    for _ in 0..blocks {
        keystream.extend_from_slice(&state.register);
        step(&mut state.register);
    }
    if batched {
        prim.encrypt_blocks(&mut keystream);
    } else {
        keystream
            .chunks_exact_mut(bs)
            .for_each(|block| prim.encrypt_block(block));
    }

    xor_in_place(&mut out[buffered..], &keystream[..remaining]);
    state.keystream.extend_from_slice(&keystream[remaining..]);
    keystream.zeroize();
    Ok((out, state))
}

pub fn ofb<P: BlockPrimitive + ?Sized>(
    prim: &P,
    mut state: ChainState,
    data: &[u8],
) -> Result<ModeOutput> {
    let bs = prim.block_size();
    check_register(&state, bs)?;

    let mut out = data.to_vec();
    let buffered = state.keystream.len().min(out.len());
    xor_in_place(&mut out[..buffered], &state.keystream[..buffered]);
    state.keystream.drain(..buffered);

    for chunk in out[buffered..].chunks_mut(bs) {
        prim.encrypt_block(&mut state.register);
        xor_in_place(chunk, &state.register);
        if chunk.len() < bs {
            state.keystream.extend_from_slice(&state.register[chunk.len()..]);
        }
    }
    Ok((out, state))
}

/// Full-block cipher feedback.
///
/// While `pos > 0` the register holds the ciphertext bytes of the current
/// block before `pos` and unused keystream bytes from `pos` on.
pub fn cfb<P: BlockPrimitive + ?Sized>(
    prim: &P,
    dir: Direction,
    mut state: ChainState,
    data: &[u8],
) -> Result<ModeOutput> {
    let bs = prim.block_size();
    check_register(&state, bs)?;

    let mut out = Vec::with_capacity(data.len());
    let mut input = data;

    if state.pos > 0 {
        let take = (bs - state.pos).min(input.len());
        for &byte in &input[..take] {
            let slot = &mut state.register[state.pos];
            let output = byte ^ *slot;
            *slot = match dir {
                Direction::Encrypt => output,
                Direction::Decrypt => byte,
            };
            out.push(output);
            state.pos += 1;
        }
        state.pos %= bs;
        input = &input[take..];
    }

    for chunk in input.chunks(bs) {
        prim.encrypt_block(&mut state.register);
        for (i, &byte) in chunk.iter().enumerate() {
            let output = byte ^ state.register[i];
            state.register[i] = match dir {
                Direction::Encrypt => output,
                Direction::Decrypt => byte,
            };
            out.push(output);
        }
        state.pos = chunk.len() % bs;
    }
    Ok((out, state))
}

/// 8-bit cipher feedback: one block encryption per byte.
pub fn cfb8<P: BlockPrimitive + ?Sized>(
    prim: &P,
    dir: Direction,
    mut state: ChainState,
    data: &[u8],
) -> Result<ModeOutput> {
    let bs = prim.block_size();
    check_register(&state, bs)?;

    let mut out = Vec::with_capacity(data.len());
    let mut window = vec![0u8; bs];
    for &byte in data {
        window.copy_from_slice(&state.register);
        prim.encrypt_block(&mut window);
        let output = byte ^ window[0];
        let feedback = match dir {
            Direction::Encrypt => output,
            Direction::Decrypt => byte,
        };
        state.register.rotate_left(1);
        state.register[bs - 1] = feedback;
        out.push(output);
    }
    window.zeroize();
    Ok((out, state))
}
