// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Constant-time operations to prevent timing attacks
//!
//! Tag verification goes through here so that the time it takes does not
//! depend on where the supplied and derived tags first differ.

use crate::aead::{MAX_TAG_LEN, MIN_TAG_LEN};
use subtle::ConstantTimeEq;

/// Constant-time comparison of two byte arrays
///
/// Lengths are not secret: arrays of different length compare unequal
/// immediately.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Compares a supplied (possibly truncated) tag against the leading bytes
/// of the derived full tag.
pub fn tag_matches(expected: &[u8; MAX_TAG_LEN], supplied: &[u8]) -> bool {
    if !(MIN_TAG_LEN..=MAX_TAG_LEN).contains(&supplied.len()) {
        return false;
    }
    constant_time_eq(&expected[..supplied.len()], supplied)
}
