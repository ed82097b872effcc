// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod mode;
pub mod modes;
pub mod pkcs7;
pub mod session;
pub mod state;


pub use mode::Mode;
pub use pkcs7::Pkcs7Padding;
pub use session::Cipher;
pub use state::ChainState;
