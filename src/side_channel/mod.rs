// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Side-channel attack protection module

pub mod constant_time;

pub use constant_time::{constant_time_eq, tag_matches};
