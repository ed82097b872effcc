// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Fast path: one mode kernel per (cipher, mode) pair.
//!
//! Each kernel is the generic mode engine instantiated for a concrete
//! primitive type, so block calls are static and inlinable. The kernel is
//! picked once when the engine is selected and stored as a plain function
//! pointer in the session.

use crate::cipher::mode::Mode;
use crate::cipher::modes::{self, ModeOutput};
use crate::cipher::state::ChainState;
use crate::engine::BlockCore;
use crate::error::{CryptoError, Result};
use crate::primitive::{AesPrimitive, BlockPrimitive, Sm4Primitive};
use crate::types::Direction;

pub(crate) type ModeKernel = fn(&BlockCore, Direction, ChainState, &[u8]) -> Result<ModeOutput>;

/// Concrete primitive reachable from a [`BlockCore`].
trait FastPrimitive: BlockPrimitive + Sized {
    fn from_core(core: &BlockCore) -> Option<&Self>;
}

impl FastPrimitive for AesPrimitive {
    fn from_core(core: &BlockCore) -> Option<&Self> {
        match core {
            BlockCore::Aes(p) => Some(p),
            _ => None,
        }
    }
}

impl FastPrimitive for Sm4Primitive {
    fn from_core(core: &BlockCore) -> Option<&Self> {
        match core {
            BlockCore::Sm4(p) => Some(p),
            _ => None,
        }
    }
}

trait FastMode {
    fn run<P: BlockPrimitive>(
        prim: &P,
        dir: Direction,
        state: ChainState,
        data: &[u8],
    ) -> Result<ModeOutput>;
}

struct Ecb;
struct Cbc;
struct Ctr;
struct Cfb;
struct Cfb8;
struct Ofb;
struct Gcm;

impl FastMode for Ecb {
    fn run<P: BlockPrimitive>(
        prim: &P,
        dir: Direction,
        state: ChainState,
        data: &[u8],
    ) -> Result<ModeOutput> {
        modes::ecb(prim, dir, data, false).map(|out| (out, state))
    }
}

impl FastMode for Cbc {
    fn run<P: BlockPrimitive>(
        prim: &P,
        dir: Direction,
        state: ChainState,
        data: &[u8],
    ) -> Result<ModeOutput> {
        modes::cbc(prim, dir, state, data)
    }
}

impl FastMode for Ctr {
    fn run<P: BlockPrimitive>(
        prim: &P,
        _dir: Direction,
        state: ChainState,
        data: &[u8],
    ) -> Result<ModeOutput> {
        modes::ctr(prim, state, data, false, modes::increment_be)
    }
}

impl FastMode for Cfb {
    fn run<P: BlockPrimitive>(
        prim: &P,
        dir: Direction,
        state: ChainState,
        data: &[u8],
    ) -> Result<ModeOutput> {
        modes::cfb(prim, dir, state, data)
    }
}

impl FastMode for Cfb8 {
    fn run<P: BlockPrimitive>(
        prim: &P,
        dir: Direction,
        state: ChainState,
        data: &[u8],
    ) -> Result<ModeOutput> {
        modes::cfb8(prim, dir, state, data)
    }
}

impl FastMode for Ofb {
    fn run<P: BlockPrimitive>(
        prim: &P,
        _dir: Direction,
        state: ChainState,
        data: &[u8],
    ) -> Result<ModeOutput> {
        modes::ofb(prim, state, data)
    }
}

impl FastMode for Gcm {
    fn run<P: BlockPrimitive>(
        prim: &P,
        _dir: Direction,
        state: ChainState,
        data: &[u8],
    ) -> Result<ModeOutput> {
        modes::ctr(prim, state, data, false, crate::aead::gcm::inc32)
    }
}

fn kernel<P: FastPrimitive, M: FastMode>(
    core: &BlockCore,
    dir: Direction,
    state: ChainState,
    data: &[u8],
) -> Result<ModeOutput> {
    let prim = P::from_core(core).ok_or_else(|| {
        CryptoError::InternalError("fast path kernel bound to another cipher".into())
    })?;
    M::run(prim, dir, state, data)
}

fn kernel_for<P: FastPrimitive>(mode: Mode) -> Option<ModeKernel> {
    let selected: ModeKernel = match mode {
        Mode::Ecb => kernel::<P, Ecb>,
        Mode::Cbc => kernel::<P, Cbc>,
        Mode::Ctr => kernel::<P, Ctr>,
        Mode::Cfb => kernel::<P, Cfb>,
        Mode::Cfb8 => kernel::<P, Cfb8>,
        Mode::Ofb => kernel::<P, Ofb>,
        Mode::Gcm => kernel::<P, Gcm>,
        Mode::Stream => return None,
    };
    Some(selected)
}

/// Picks the kernel for the session's primitive and mode.
pub(crate) fn select_kernel(core: &BlockCore, mode: Mode) -> Option<ModeKernel> {
    match core {
        BlockCore::Aes(_) => kernel_for::<AesPrimitive>(mode),
        BlockCore::Sm4(_) => kernel_for::<Sm4Primitive>(mode),
        BlockCore::Custom(_) => None,
    }
}
