// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Authentication layer: GHASH over GF(2^128), Poly1305 over 2^130 - 5 and
//! the GCM pre-counter / tag construction shared by every engine.

pub mod gcm;
pub mod gf128;
pub mod poly1305;

pub use gf128::Ghash;
pub use poly1305::Poly1305;

/// Smallest tag length accepted by `get_tag` / `set_tag`.
pub const MIN_TAG_LEN: usize = 4;
/// Full tag length.
pub const MAX_TAG_LEN: usize = 16;
