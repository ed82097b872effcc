// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::error::{CryptoError, Result};
use subtle::{ConstantTimeEq, ConstantTimeGreater};

/// PKCS#7填充实现
pub struct Pkcs7Padding;

impl Pkcs7Padding {
    /// 对数据进行PKCS#7填充
    ///
    /// Always appends between 1 and `block_size` bytes, each equal to the
    /// number of bytes appended; a block-aligned input gets a full block.
    ///
    /// # 参数
    /// * `data` - 需要填充的数据
    /// * `block_size` - 块大小（必须是2-255之间的值）
    pub fn pad(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
        Self::check_block_size(block_size)?;

        let padding_len = Self::get_padding_length(data.len(), block_size);
        let mut result = Vec::with_capacity(data.len() + padding_len);
        result.extend_from_slice(data);
        result.resize(data.len() + padding_len, padding_len as u8);
        Ok(result)
    }

    /// 移除PKCS#7填充
    ///
    /// A last byte of zero or larger than the block size, or pad bytes that
    /// do not all repeat it, are reported as [`CryptoError::BadDecryption`]:
    /// with a block mode this almost always means the key was wrong.
    pub fn unpad(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
        Self::check_block_size(block_size)?;

        if data.len() < block_size || data.len() % block_size != 0 {
            return Err(CryptoError::InvalidLength(format!(
                "padded data length ({}) is not a positive multiple of the block size ({})",
                data.len(),
                block_size
            )));
        }

        let last = data[data.len() - 1];
        let padding_len = last as usize;
        if padding_len == 0 || padding_len > block_size {
            return Err(CryptoError::BadDecryption(format!(
                "invalid padding length ({}) compared to the block size ({})",
                padding_len, block_size
            )));
        }

        // 验证所有填充字节是否正确 (scan the whole final block)
        let tail = &data[data.len() - block_size..];
        let mut bad = 0u8;
        for (i, &byte) in tail.iter().rev().enumerate() {
            let in_padding = (padding_len as u8).ct_gt(&(i as u8));
            let mismatch = !byte.ct_eq(&last);
            bad |= (in_padding & mismatch).unwrap_u8();
        }
        if bad != 0 {
            return Err(CryptoError::BadDecryption("invalid padding bytes".into()));
        }

        Ok(data[..data.len() - padding_len].to_vec())
    }

    /// 获取需要填充的长度
    pub fn get_padding_length(data_len: usize, block_size: usize) -> usize {
        if block_size == 0 {
            return 0;
        }
        block_size - (data_len % block_size)
    }

    fn check_block_size(block_size: usize) -> Result<()> {
        if !(2..=255).contains(&block_size) {
            return Err(CryptoError::InvalidParameter(format!(
                "Invalid block size: {}",
                block_size
            )));
        }
        Ok(())
    }
}
