// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::error::{CryptoError, Result};
use crate::primitive::BlockPrimitive;
use aes::{Aes128, Aes192, Aes256};
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit};

/// AES key length enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesKeyLength {
    Aes128,
    Aes192,
    Aes256,
}

impl AesKeyLength {
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(AesKeyLength::Aes128),
            24 => Some(AesKeyLength::Aes192),
            32 => Some(AesKeyLength::Aes256),
            _ => None,
        }
    }
}

/// Expanded AES key, one variant per key length.
#[derive(Clone)]
pub(crate) enum AesSchedule {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

/// AES block primitive over the `aes` crate.
#[derive(Clone, Default)]
pub struct AesPrimitive {
    schedule: Option<AesSchedule>,
}

impl AesPrimitive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_length(&self) -> Option<AesKeyLength> {
        self.schedule.as_ref().map(|s| match s {
            AesSchedule::Aes128(_) => AesKeyLength::Aes128,
            AesSchedule::Aes192(_) => AesKeyLength::Aes192,
            AesSchedule::Aes256(_) => AesKeyLength::Aes256,
        })
    }
}

impl BlockPrimitive for AesPrimitive {
    fn name(&self) -> &'static str {
        "aes"
    }

    fn block_size(&self) -> usize {
        16
    }

    fn is_valid_key_length(&self, len: usize) -> bool {
        AesKeyLength::from_len(len).is_some()
    }

    fn setup_key(&mut self, key: &[u8]) -> Result<()> {
        let invalid =
            |_| CryptoError::InvalidLength(format!("Invalid AES key size: {}", key.len()));
        let schedule = match AesKeyLength::from_len(key.len()) {
            Some(AesKeyLength::Aes128) => {
                AesSchedule::Aes128(Aes128::new_from_slice(key).map_err(invalid)?)
            }
            Some(AesKeyLength::Aes192) => {
                AesSchedule::Aes192(Aes192::new_from_slice(key).map_err(invalid)?)
            }
            Some(AesKeyLength::Aes256) => {
                AesSchedule::Aes256(Aes256::new_from_slice(key).map_err(invalid)?)
            }
            None => {
                return Err(CryptoError::InvalidLength(format!(
                    "Key of size {} not supported by AES; supported sizes are 16, 24 and 32",
                    key.len()
                )))
            }
        };
        self.schedule = Some(schedule);
        Ok(())
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match &self.schedule {
            Some(AesSchedule::Aes128(c)) => c.encrypt_block(block),
            Some(AesSchedule::Aes192(c)) => c.encrypt_block(block),
            Some(AesSchedule::Aes256(c)) => c.encrypt_block(block),
            None => debug_assert!(false, "AES used before setup_key"),
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match &self.schedule {
            Some(AesSchedule::Aes128(c)) => c.decrypt_block(block),
            Some(AesSchedule::Aes192(c)) => c.decrypt_block(block),
            Some(AesSchedule::Aes256(c)) => c.decrypt_block(block),
            None => debug_assert!(false, "AES used before setup_key"),
        }
    }

    fn encrypt_blocks(&self, blocks: &mut [u8]) {
        match &self.schedule {
            Some(AesSchedule::Aes128(c)) => encrypt_blocks_with(c, blocks),
            Some(AesSchedule::Aes192(c)) => encrypt_blocks_with(c, blocks),
            Some(AesSchedule::Aes256(c)) => encrypt_blocks_with(c, blocks),
            None => debug_assert!(false, "AES used before setup_key"),
        }
    }

    fn decrypt_blocks(&self, blocks: &mut [u8]) {
        match &self.schedule {
            Some(AesSchedule::Aes128(c)) => decrypt_blocks_with(c, blocks),
            Some(AesSchedule::Aes192(c)) => decrypt_blocks_with(c, blocks),
            Some(AesSchedule::Aes256(c)) => decrypt_blocks_with(c, blocks),
            None => debug_assert!(false, "AES used before setup_key"),
        }
    }
}

/// Runs the cipher crate's batched encryption over whole blocks of `data`.
pub(crate) fn encrypt_blocks_with<C: BlockEncrypt>(cipher: &C, data: &mut [u8]) {
    let block_size = C::block_size();
    let mut blocks: Vec<cipher::Block<C>> = data
        .chunks_exact(block_size)
        .map(GenericArray::clone_from_slice)
        .collect();
    cipher.encrypt_blocks(&mut blocks);
    for (chunk, block) in data.chunks_exact_mut(block_size).zip(blocks.iter()) {
        chunk.copy_from_slice(block);
    }
}

/// Runs the cipher crate's batched decryption over whole blocks of `data`.
pub(crate) fn decrypt_blocks_with<C: BlockDecrypt + BlockSizeUser>(cipher: &C, data: &mut [u8]) {
    let block_size = C::block_size();
    let mut blocks: Vec<cipher::Block<C>> = data
        .chunks_exact(block_size)
        .map(GenericArray::clone_from_slice)
        .collect();
    cipher.decrypt_blocks(&mut blocks);
    for (chunk, block) in data.chunks_exact_mut(block_size).zip(blocks.iter()) {
        chunk.copy_from_slice(block);
    }
}
