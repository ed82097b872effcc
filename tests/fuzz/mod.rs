// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 模糊测试模块
//!
//! Property tests over random keys, IVs and inputs.

mod fuzz_cipher;
