// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Password-based derivation of a session key (and IV).

use crate::config::KdfDefaults;
use crate::error::{CryptoError, Result};
use crate::hash::HashAlgorithm;
use hmac::digest::core_api::BlockSizeUser;
use hmac::digest::Digest;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac, SimpleHmac};
use pbkdf2::pbkdf2;
use zeroize::Zeroizing;

/// 密钥派生参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    pub hash: HashAlgorithm,
    pub salt: Vec<u8>,
    pub iterations: u32,
    /// Derived length in bytes; `None` follows the session key length.
    pub key_length: Option<usize>,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::from_defaults(&KdfDefaults::default())
    }
}

impl KdfParams {
    pub fn from_defaults(defaults: &KdfDefaults) -> Self {
        Self {
            hash: defaults.hash,
            salt: defaults.salt.clone(),
            iterations: defaults.iterations,
            key_length: None,
        }
    }

    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_salt(mut self, salt: &[u8]) -> Self {
        self.salt = salt.to_vec();
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_key_length(mut self, len: usize) -> Self {
        self.key_length = Some(len);
        self
    }
}

/// 口令派生方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordMethod {
    /// RFC 8018 PBKDF1; the output is split into key and IV
    Pbkdf1(KdfParams),
    /// RFC 8018 PBKDF2 with HMAC
    Pbkdf2(KdfParams),
    /// RFC 7292 appendix B.2
    Pkcs12(KdfParams),
}

impl PasswordMethod {
    pub fn from_name(name: &str, params: KdfParams) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pbkdf1" => Ok(PasswordMethod::Pbkdf1(params)),
            "pbkdf2" => Ok(PasswordMethod::Pbkdf2(params)),
            "pkcs12" => Ok(PasswordMethod::Pkcs12(params)),
            other => Err(CryptoError::UnsupportedAlgorithm(format!(
                "unsupported password derivation method: {}",
                other
            ))),
        }
    }

    pub fn params(&self) -> &KdfParams {
        match self {
            PasswordMethod::Pbkdf1(p) | PasswordMethod::Pbkdf2(p) | PasswordMethod::Pkcs12(p) => p,
        }
    }
}

impl Default for PasswordMethod {
    fn default() -> Self {
        PasswordMethod::Pbkdf2(KdfParams::default())
    }
}

/// Key and optional IV produced by [`derive_key`].
pub struct DerivedSecret {
    pub key: Zeroizing<Vec<u8>>,
    pub iv: Option<Zeroizing<Vec<u8>>>,
}

impl std::fmt::Debug for DerivedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedSecret")
            .field("key_len", &self.key.len())
            .field("iv_len", &self.iv.as_ref().map(|iv| iv.len()))
            .finish()
    }
}

/// Derives key material for a session.
///
/// * `key_len` - session key length, used when the parameters do not fix one
/// * `iv_len` - IV length when the session's mode needs an IV
pub fn derive_key(
    password: &str,
    method: &PasswordMethod,
    key_len: usize,
    iv_len: Option<usize>,
) -> Result<DerivedSecret> {
    let params = method.params();
    if params.iterations == 0 {
        return Err(CryptoError::InvalidParameter(
            "iteration count must be positive".into(),
        ));
    }

    match method {
        PasswordMethod::Pbkdf1(p) => {
            let dk_len = p.key_length.unwrap_or(key_len * 2);
            check_length(dk_len)?;
            let dk = pbkdf1(p.hash, password.as_bytes(), &p.salt, p.iterations, dk_len)?;
            let (key, rest) = dk.split_at(dk_len / 2);
            let iv = match iv_len {
                Some(n) if rest.len() >= n => Some(Zeroizing::new(rest[..n].to_vec())),
                Some(n) => {
                    return Err(CryptoError::InvalidLength(format!(
                        "PBKDF1 output leaves {} bytes for a {}-byte IV",
                        rest.len(),
                        n
                    )))
                }
                None => None,
            };
            Ok(DerivedSecret {
                key: Zeroizing::new(key.to_vec()),
                iv,
            })
        }
        PasswordMethod::Pbkdf2(p) => {
            let dk_len = p.key_length.unwrap_or(key_len);
            check_length(dk_len)?;
            let key = pbkdf2_derive(p.hash, password.as_bytes(), &p.salt, p.iterations, dk_len)?;
            Ok(DerivedSecret { key, iv: None })
        }
        PasswordMethod::Pkcs12(p) => {
            let dk_len = p.key_length.unwrap_or(key_len);
            check_length(dk_len)?;
            let bmp = bmp_password(password);
            let key = pkcs12_kdf(p.hash, &bmp, &p.salt, PKCS12_KEY_ID, p.iterations, dk_len);
            let iv = iv_len
                .map(|n| pkcs12_kdf(p.hash, &bmp, &p.salt, PKCS12_IV_ID, p.iterations, n));
            Ok(DerivedSecret { key, iv })
        }
    }
}

fn check_length(len: usize) -> Result<()> {
    if len == 0 {
        return Err(CryptoError::InvalidLength(
            "derived key length must be positive".into(),
        ));
    }
    Ok(())
}

/// PBKDF1: `T_c = H^c(P ‖ S)`, truncated to `dk_len`.
pub fn pbkdf1(
    hash: HashAlgorithm,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    dk_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if dk_len > hash.output_len() {
        return Err(CryptoError::InvalidLength(format!(
            "derived key length ({}) cannot be longer than the {} output ({})",
            dk_len,
            hash,
            hash.output_len()
        )));
    }

    let mut t = Zeroizing::new([password, salt].concat());
    for _ in 0..iterations {
        t = Zeroizing::new(hash.digest(&t));
    }
    t.truncate(dk_len);
    Ok(t)
}

/// PBKDF2; SHA-2 goes through the `pbkdf2` crate, other hashes through
/// [`pbkdf2_hmac_manual`].
pub fn pbkdf2_derive(
    hash: HashAlgorithm,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    dk_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut out = Zeroizing::new(vec![0u8; dk_len]);
    let result = match hash {
        HashAlgorithm::Sha224 => pbkdf2::<Hmac<sha2::Sha224>>(password, salt, iterations, &mut out),
        HashAlgorithm::Sha256 => pbkdf2::<Hmac<sha2::Sha256>>(password, salt, iterations, &mut out),
        HashAlgorithm::Sha384 => pbkdf2::<Hmac<sha2::Sha384>>(password, salt, iterations, &mut out),
        HashAlgorithm::Sha512 => pbkdf2::<Hmac<sha2::Sha512>>(password, salt, iterations, &mut out),
        HashAlgorithm::Sha512_224 => {
            pbkdf2::<Hmac<sha2::Sha512_224>>(password, salt, iterations, &mut out)
        }
        HashAlgorithm::Sha512_256 => {
            pbkdf2::<Hmac<sha2::Sha512_256>>(password, salt, iterations, &mut out)
        }
        HashAlgorithm::Sm3 => pbkdf2_hmac_manual::<sm3::Sm3>(password, salt, iterations, &mut out),
    };
    result.map_err(|e| CryptoError::InternalError(format!("PBKDF2 failed: {:?}", e)))?;
    Ok(out)
}

/// PBKDF2 written out over `SimpleHmac`, for hashes without a native path.
pub fn pbkdf2_hmac_manual<D>(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    out: &mut [u8],
) -> std::result::Result<(), InvalidLength>
where
    D: Digest + BlockSizeUser + Clone,
{
    let prf = <SimpleHmac<D> as Mac>::new_from_slice(password)?;

    for (index, chunk) in out.chunks_mut(<D as Digest>::output_size()).enumerate() {
        let mut mac = prf.clone();
        mac.update(salt);
        mac.update(&(index as u32 + 1).to_be_bytes());
        let mut u = Zeroizing::new(mac.finalize().into_bytes().to_vec());
        let mut t = u.clone();

        for _ in 1..iterations {
            let mut mac = prf.clone();
            mac.update(&u);
            u = Zeroizing::new(mac.finalize().into_bytes().to_vec());
            for (a, b) in t.iter_mut().zip(u.iter()) {
                *a ^= b;
            }
        }
        chunk.copy_from_slice(&t[..chunk.len()]);
    }
    Ok(())
}

const PKCS12_KEY_ID: u8 = 1;
const PKCS12_IV_ID: u8 = 2;

/// Password as a BMPString (UTF-16BE) with a two-byte terminator.
fn bmp_password(password: &str) -> Zeroizing<Vec<u8>> {
    let mut bmp: Vec<u8> = password.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
    bmp.extend_from_slice(&[0, 0]);
    Zeroizing::new(bmp)
}

/// Repeats `src` to the next multiple of `v` bytes.
fn fill_to_multiple(src: &[u8], v: usize) -> Vec<u8> {
    if src.is_empty() {
        return Vec::new();
    }
    let len = v * src.len().div_ceil(v);
    (0..len).map(|i| src[i % src.len()]).collect()
}

/// RFC 7292 appendix B.2 with the given purpose `id`.
pub fn pkcs12_kdf(
    hash: HashAlgorithm,
    password: &[u8],
    salt: &[u8],
    id: u8,
    iterations: u32,
    n: usize,
) -> Zeroizing<Vec<u8>> {
    let u = hash.output_len();
    let v = hash.block_len();

    let diversifier = vec![id; v];
    let mut input = Zeroizing::new(fill_to_multiple(salt, v));
    input.extend_from_slice(&fill_to_multiple(password, v));

    let mut out = Zeroizing::new(Vec::with_capacity(n));
    loop {
        let mut a = Zeroizing::new(
            hash.digest(&[diversifier.as_slice(), input.as_slice()].concat()),
        );
        for _ in 1..iterations {
            a = Zeroizing::new(hash.digest(&a));
        }
        let take = (n - out.len()).min(u);
        out.extend_from_slice(&a[..take]);
        if out.len() >= n {
            return out;
        }

        // I_j = (I_j + B + 1) mod 2^(8v)
        let b: Vec<u8> = (0..v).map(|k| a[k % u]).collect();
        for block in input.chunks_mut(v) {
            let mut carry = 1u16;
            for k in (0..v).rev() {
                let sum = block[k] as u16 + b[k] as u16 + carry;
                block[k] = sum as u8;
                carry = sum >> 8;
            }
        }
    }
}
