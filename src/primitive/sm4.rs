// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::error::{CryptoError, Result};
use crate::primitive::aes::{decrypt_blocks_with, encrypt_blocks_with};
use crate::primitive::BlockPrimitive;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use sm4::Sm4;

/// SM4 (GB/T 32907-2016) block primitive over the `sm4` crate.
#[derive(Clone, Default)]
pub struct Sm4Primitive {
    schedule: Option<Sm4>,
}

impl Sm4Primitive {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn schedule(&self) -> Option<&Sm4> {
        self.schedule.as_ref()
    }
}

impl BlockPrimitive for Sm4Primitive {
    fn name(&self) -> &'static str {
        "sm4"
    }

    fn block_size(&self) -> usize {
        16
    }

    fn is_valid_key_length(&self, len: usize) -> bool {
        len == 16
    }

    fn setup_key(&mut self, key: &[u8]) -> Result<()> {
        let schedule = Sm4::new_from_slice(key).map_err(|_| {
            CryptoError::InvalidLength(format!(
                "Invalid SM4 key length {}, must be 128 bits",
                key.len()
            ))
        })?;
        self.schedule = Some(schedule);
        Ok(())
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        if let Some(c) = &self.schedule {
            c.encrypt_block(GenericArray::from_mut_slice(block));
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        if let Some(c) = &self.schedule {
            c.decrypt_block(GenericArray::from_mut_slice(block));
        }
    }

    fn encrypt_blocks(&self, blocks: &mut [u8]) {
        if let Some(c) = &self.schedule {
            encrypt_blocks_with(c, blocks);
        }
    }

    fn decrypt_blocks(&self, blocks: &mut [u8]) {
        if let Some(c) = &self.schedule {
            decrypt_blocks_with(c, blocks);
        }
    }
}
