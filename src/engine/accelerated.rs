// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Accelerated engine: counter mode, GCM and Poly1305 from the RustCrypto
//! mode crates instead of the in-crate mode engine.

use crate::aead::gcm::{inc32, length_block};
use crate::error::{CryptoError, Result};
use crate::side_channel::constant_time::tag_matches;
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{AeadInPlace, AesGcm, KeyInit};
use cipher::{BlockEncrypt, KeyIvInit, StreamCipher};
use ghash::universal_hash::UniversalHash;
use ghash::GHash;
use sm4::Sm4;
use zeroize::Zeroize;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes192Ctr = ctr::Ctr128BE<Aes192>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type Sm4Ctr = ctr::Ctr128BE<Sm4>;
/// GCM data counter: only the low 32 bits advance.
type Sm4GcmCtr = ctr::Ctr32BE<Sm4>;

type Aes128Gcm = AesGcm<Aes128, U12>;
type Aes192Gcm = AesGcm<Aes192, U12>;
type Aes256Gcm = AesGcm<Aes256, U12>;

/// Nonce length the accelerated GCM path accepts.
pub const GCM_NONCE_LEN: usize = 12;

fn invalid_length(what: &str) -> impl Fn(cipher::InvalidLength) -> CryptoError + '_ {
    move |_| CryptoError::InvalidLength(format!("accelerated {}: invalid key or IV length", what))
}

/// Live counter-mode handle.
///
/// Kept by the session across calls in continuous-buffer mode so the
/// library's own counter and partial-block buffer carry the chaining state.
pub(crate) enum CtrHandle {
    Aes128(Aes128Ctr),
    Aes192(Aes192Ctr),
    Aes256(Aes256Ctr),
    Sm4(Sm4Ctr),
}

impl CtrHandle {
    pub(crate) fn new(cipher: &str, key: &[u8], iv: &[u8]) -> Result<Self> {
        let err = invalid_length("CTR");
        let handle = match (cipher, key.len()) {
            ("aes", 16) => CtrHandle::Aes128(Aes128Ctr::new_from_slices(key, iv).map_err(&err)?),
            ("aes", 24) => CtrHandle::Aes192(Aes192Ctr::new_from_slices(key, iv).map_err(&err)?),
            ("aes", 32) => CtrHandle::Aes256(Aes256Ctr::new_from_slices(key, iv).map_err(&err)?),
            ("sm4", 16) => CtrHandle::Sm4(Sm4Ctr::new_from_slices(key, iv).map_err(&err)?),
            (name, len) => {
                return Err(CryptoError::UnsupportedAlgorithm(format!(
                    "no accelerated CTR for {} with a {}-byte key",
                    name, len
                )))
            }
        };
        Ok(handle)
    }

    pub(crate) fn apply(&mut self, data: &mut [u8]) {
        match self {
            CtrHandle::Aes128(c) => c.apply_keystream(data),
            CtrHandle::Aes192(c) => c.apply_keystream(data),
            CtrHandle::Aes256(c) => c.apply_keystream(data),
            CtrHandle::Sm4(c) => c.apply_keystream(data),
        }
    }
}

/// One-shot counter mode starting at `iv`.
pub(crate) fn ctr_apply(cipher: &str, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
    CtrHandle::new(cipher, key, iv)?.apply(data);
    Ok(())
}

fn check_nonce(nonce: &[u8]) -> Result<()> {
    if nonce.len() != GCM_NONCE_LEN {
        return Err(CryptoError::InvalidParameter(format!(
            "accelerated GCM needs a {}-byte nonce, got {}",
            GCM_NONCE_LEN,
            nonce.len()
        )));
    }
    Ok(())
}

fn aes_seal<G: KeyInit + AeadInPlace>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    buffer: &mut [u8],
) -> Result<[u8; 16]> {
    let gcm = G::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidLength("Invalid AES-GCM key length".into()))?;
    let tag = gcm
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), aad, buffer)
        .map_err(|_| CryptoError::InternalError("AES-GCM encryption failed".into()))?;
    let mut out = [0u8; 16];
    out.copy_from_slice(&tag);
    Ok(out)
}

fn aes_open<G: KeyInit + AeadInPlace>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    buffer: &mut [u8],
    tag: &[u8],
) -> Result<()> {
    if tag.len() == 16 {
        let gcm = G::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidLength("Invalid AES-GCM key length".into()))?;
        return gcm
            .decrypt_in_place_detached(
                GenericArray::from_slice(nonce),
                aad,
                buffer,
                GenericArray::from_slice(tag),
            )
            .map_err(|_| CryptoError::AuthenticationFailed);
    }

    // 截断标签：先用同一密钥流解密，再重新加密得到完整标签后比较前缀
    let _ = aes_seal::<G>(key, nonce, aad, buffer)?;
    let mut ciphertext = buffer.to_vec();
    let expected = aes_seal::<G>(key, nonce, aad, &mut ciphertext)?;
    ciphertext.zeroize();
    if tag_matches(&expected, tag) {
        Ok(())
    } else {
        Err(CryptoError::AuthenticationFailed)
    }
}

/// SM4-GCM from `ctr` and `ghash`; returns the full tag over the ciphertext.
fn sm4_gcm(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    buffer: &mut [u8],
    encrypting: bool,
) -> Result<[u8; 16]> {
    let sm4 = <Sm4 as KeyInit>::new_from_slice(key).map_err(|_| {
        CryptoError::InvalidLength("Invalid SM4 key length, must be 128 bits".into())
    })?;
    let mut h = GenericArray::default();
    sm4.encrypt_block(&mut h);

    let mut j0 = [0u8; 16];
    j0[..12].copy_from_slice(nonce);
    j0[15] = 1;
    let mut counter = j0;
    inc32(&mut counter);

    let mut ghash = <GHash as ghash::universal_hash::KeyInit>::new(&h);
    ghash.update_padded(aad);
    if !encrypting {
        ghash.update_padded(buffer);
    }
    Sm4GcmCtr::new_from_slices(key, &counter)
        .map_err(invalid_length("SM4-GCM"))?
        .apply_keystream(buffer);
    if encrypting {
        ghash.update_padded(buffer);
    }
    ghash.update_padded(&length_block(aad.len(), buffer.len()));
    let s = ghash.finalize();

    let mut tag = GenericArray::from(j0);
    sm4.encrypt_block(&mut tag);
    let mut out = [0u8; 16];
    for (o, (t, x)) in out.iter_mut().zip(tag.iter().zip(s.iter())) {
        *o = t ^ x;
    }
    Ok(out)
}

/// Encrypts `buffer` in place and returns the full 16-byte tag.
pub(crate) fn gcm_seal(
    cipher: &str,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    buffer: &mut [u8],
) -> Result<[u8; 16]> {
    check_nonce(nonce)?;
    match (cipher, key.len()) {
        ("aes", 16) => aes_seal::<Aes128Gcm>(key, nonce, aad, buffer),
        ("aes", 24) => aes_seal::<Aes192Gcm>(key, nonce, aad, buffer),
        ("aes", 32) => aes_seal::<Aes256Gcm>(key, nonce, aad, buffer),
        ("sm4", _) => sm4_gcm(key, nonce, aad, buffer, true),
        (name, _) => Err(CryptoError::UnsupportedAlgorithm(format!(
            "no accelerated GCM for {}",
            name
        ))),
    }
}

/// Verifies `tag` (4 to 16 bytes) and decrypts `buffer` in place.
///
/// On [`CryptoError::AuthenticationFailed`] the buffer content must be
/// discarded by the caller.
pub(crate) fn gcm_open(
    cipher: &str,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    buffer: &mut [u8],
    tag: &[u8],
) -> Result<()> {
    check_nonce(nonce)?;
    match (cipher, key.len()) {
        ("aes", 16) => aes_open::<Aes128Gcm>(key, nonce, aad, buffer, tag),
        ("aes", 24) => aes_open::<Aes192Gcm>(key, nonce, aad, buffer, tag),
        ("aes", 32) => aes_open::<Aes256Gcm>(key, nonce, aad, buffer, tag),
        ("sm4", _) => {
            let expected = sm4_gcm(key, nonce, aad, buffer, false)?;
            if tag_matches(&expected, tag) {
                Ok(())
            } else {
                Err(CryptoError::AuthenticationFailed)
            }
        }
        (name, _) => Err(CryptoError::UnsupportedAlgorithm(format!(
            "no accelerated GCM for {}",
            name
        ))),
    }
}

/// Poly1305 over the RFC 8439 framing of `aad` and `ciphertext` through the
/// `poly1305` crate.
pub(crate) fn poly1305_tag(key: &[u8; 32], aad: &[u8], ciphertext: &[u8]) -> [u8; 16] {
    let mac = <poly1305::Poly1305 as poly1305::universal_hash::KeyInit>::new(key.into());
    let padded = |len: usize| len.div_ceil(16) * 16;
    let mut message = Vec::with_capacity(padded(aad.len()) + padded(ciphertext.len()) + 16);
    message.extend_from_slice(aad);
    message.resize(padded(aad.len()), 0);
    message.extend_from_slice(ciphertext);
    message.resize(padded(aad.len()) + padded(ciphertext.len()), 0);
    message.extend_from_slice(&(aad.len() as u64).to_le_bytes());
    message.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    let tag = mac.compute_unpadded(&message);
    let mut out = [0u8; 16];
    out.copy_from_slice(&tag);
    out
}
