// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::aead::gcm;
use crate::aead::poly1305::Poly1305;
use crate::aead::{MAX_TAG_LEN, MIN_TAG_LEN};
use crate::cipher::mode::Mode;
use crate::cipher::modes::{self, ModeOutput};
use crate::cipher::pkcs7::Pkcs7Padding;
use crate::cipher::state::ChainState;
use crate::config::{CipherConfig, KdfDefaults};
use crate::engine::accelerated::{self, CtrHandle, GCM_NONCE_LEN};
use crate::engine::fastpath::{self, ModeKernel};
use crate::engine::{BlockCore, Engine, REGISTRY};
use crate::error::{CryptoError, Result};
use crate::key::derivation::{derive_key, KdfParams, PasswordMethod};
use crate::primitive::{
    AesPrimitive, BlockPrimitive, ChaCha20Primitive, Keystream, Sm4Primitive, StreamPrimitive,
};
use crate::side_channel::constant_time::tag_matches;
use crate::types::{Algorithm, Direction};
use std::borrow::Cow;
use zeroize::{Zeroize, Zeroizing};

enum Core {
    Block(BlockCore),
    Stream(Box<dyn StreamPrimitive>),
}

impl Core {
    fn name(&self) -> &'static str {
        match self {
            Core::Block(core) => core.as_dyn().name(),
            Core::Stream(prim) => prim.name(),
        }
    }

    fn is_valid_key_length(&self, len: usize) -> bool {
        match self {
            Core::Block(core) => core.as_dyn().is_valid_key_length(len),
            Core::Stream(prim) => prim.is_valid_key_length(len),
        }
    }
}

/// Per-direction handle that carries chaining state outside [`ChainState`].
enum LiveHandle {
    Ctr(CtrHandle),
    Stream(Box<dyn Keystream>),
}

/// Largest block size PKCS#7 can pad.
const MAX_PADDED_BLOCK: usize = 255;

/// Both keys MAC the RFC 8439 framing: padded aad, padded ciphertext, le64 lengths.
enum MacKey {
    /// Set with `set_poly1305_key`; data keystream starts at block 0
    Explicit(Zeroizing<[u8; 32]>),
    /// One-time key from keystream block 0; data starts at block 1
    Generated(Zeroizing<[u8; 32]>),
}

/// 对称加密会话
///
/// A session is created for one mode, configured through its setters and
/// then used for any number of `encrypt` / `decrypt` calls. Key schedule,
/// GHASH subkey and chaining state are derived lazily on the first call
/// after a change.
///
/// ```
/// use blockwise::{Algorithm, Cipher, Mode};
///
/// let mut cipher = Cipher::new(Algorithm::Aes, Mode::Cbc)?;
/// cipher.set_key(&[0u8; 16])?;
/// cipher.set_iv(&[0u8; 16])?;
/// let ciphertext = cipher.encrypt(b"attack at dawn")?;
/// assert_eq!(cipher.decrypt(&ciphertext)?, b"attack at dawn");
/// # Ok::<(), blockwise::CryptoError>(())
/// ```
pub struct Cipher {
    core: Core,
    mode: Mode,
    block_size: usize,
    default_key_length: usize,

    key: Option<Zeroizing<Vec<u8>>>,
    explicit_key_length: Option<usize>,
    /// Original IV; chaining never writes to it
    iv: Option<Vec<u8>>,
    nonce: Option<Vec<u8>>,
    aad: Vec<u8>,

    continuous_buffer: bool,
    padding: bool,
    poly1305: bool,
    poly1305_key: Option<Zeroizing<[u8; 32]>>,

    preferred_engine: Option<Engine>,
    engine: Engine,
    kernel: Option<ModeKernel>,
    ctr_emulated: bool,

    changed: bool,
    encrypt_changed: bool,
    decrypt_changed: bool,
    encrypt_state: ChainState,
    decrypt_state: ChainState,
    encrypt_handle: Option<LiveHandle>,
    decrypt_handle: Option<LiveHandle>,

    hash_subkey: Option<Zeroizing<[u8; 16]>>,
    newtag: Option<[u8; MAX_TAG_LEN]>,
    oldtag: Option<Vec<u8>>,

    kdf: KdfDefaults,
}

impl Cipher {
    /// Creates a session for a built-in algorithm.
    ///
    /// ChaCha20 only runs in [`Mode::Stream`]; the block ciphers run in
    /// every other mode.
    pub fn new(algorithm: Algorithm, mode: Mode) -> Result<Self> {
        let core = match algorithm {
            Algorithm::Aes => Core::Block(BlockCore::Aes(AesPrimitive::new())),
            Algorithm::Sm4 => Core::Block(BlockCore::Sm4(Sm4Primitive::new())),
            Algorithm::ChaCha20 => Core::Stream(Box::new(ChaCha20Primitive::new())),
        };
        Self::from_core(core, mode, algorithm.default_key_size())
    }

    /// Creates a session from a mode name such as `"cbc"` or `"cfb8"`.
    pub fn from_mode_name(algorithm: Algorithm, mode: &str) -> Result<Self> {
        Self::new(algorithm, mode.parse()?)
    }

    /// Creates a session over a caller-supplied block primitive.
    pub fn with_block_primitive(primitive: Box<dyn BlockPrimitive>, mode: Mode) -> Result<Self> {
        let default_key_length = (1..=64)
            .find(|len| primitive.is_valid_key_length(*len))
            .unwrap_or(0);
        Self::from_core(
            Core::Block(BlockCore::Custom(primitive)),
            mode,
            default_key_length,
        )
    }

    /// Creates a [`Mode::Stream`] session over a caller-supplied stream primitive.
    pub fn with_stream_primitive(primitive: Box<dyn StreamPrimitive>) -> Result<Self> {
        let default_key_length = (1..=64)
            .find(|len| primitive.is_valid_key_length(*len))
            .unwrap_or(0);
        Self::from_core(Core::Stream(primitive), Mode::Stream, default_key_length)
    }

    /// Creates a session and applies `config`.
    pub fn with_config(algorithm: Algorithm, mode: Mode, config: &CipherConfig) -> Result<Self> {
        let mut cipher = Self::new(algorithm, mode)?;
        cipher.apply_config(config)?;
        Ok(cipher)
    }

    fn from_core(core: Core, mode: Mode, default_key_length: usize) -> Result<Self> {
        let block_size = match &core {
            Core::Block(block) => {
                if mode == Mode::Stream {
                    return Err(CryptoError::BadMode(format!(
                        "{} is a block cipher; stream mode needs a stream primitive",
                        core.name()
                    )));
                }
                let block_size = block.as_dyn().block_size();
                if block_size == 0 || block_size > MAX_PADDED_BLOCK {
                    return Err(CryptoError::BadMode(format!(
                        "{} has an unusable block size of {} bytes",
                        core.name(),
                        block_size
                    )));
                }
                if mode == Mode::Gcm && block_size != gcm::GCM_BLOCK_SIZE {
                    return Err(CryptoError::BadMode(format!(
                        "GCM is only valid for block ciphers with a 128-bit block; {} has {} bits",
                        core.name(),
                        block_size * 8
                    )));
                }
                block_size
            }
            Core::Stream(_) => {
                if mode != Mode::Stream {
                    return Err(CryptoError::BadMode(format!(
                        "{} is a stream cipher; {} mode is not available",
                        core.name(),
                        mode
                    )));
                }
                0
            }
        };

        let mut cipher = Self {
            core,
            mode,
            block_size,
            default_key_length,
            key: None,
            explicit_key_length: None,
            iv: None,
            nonce: None,
            aad: Vec::new(),
            continuous_buffer: false,
            padding: true,
            poly1305: false,
            poly1305_key: None,
            preferred_engine: None,
            engine: Engine::Portable,
            kernel: None,
            ctr_emulated: false,
            changed: true,
            encrypt_changed: true,
            decrypt_changed: true,
            encrypt_state: ChainState::default(),
            decrypt_state: ChainState::default(),
            encrypt_handle: None,
            decrypt_handle: None,
            hash_subkey: None,
            newtag: None,
            oldtag: None,
            kdf: KdfDefaults::default(),
        };
        cipher.select_engine();
        Ok(cipher)
    }

    fn apply_config(&mut self, config: &CipherConfig) -> Result<()> {
        self.padding = config.padding;
        if config.continuous_buffer {
            self.enable_continuous_buffer()?;
        }
        if let Some(engine) = config.preferred_engine {
            self.set_preferred_engine(engine);
        }
        self.kdf = config.kdf.clone();
        Ok(())
    }

    // ---- parameter lifecycle ----

    /// Sets the key.
    ///
    /// Fails with [`CryptoError::InconsistentSetup`] if a different length
    /// was fixed by [`set_key_length`](Self::set_key_length).
    pub fn set_key(&mut self, key: &[u8]) -> Result<()> {
        if let Some(expected) = self.explicit_key_length {
            if key.len() != expected {
                return Err(CryptoError::InconsistentSetup(format!(
                    "Key length has already been set to {} bits and a {}-bit key was supplied",
                    expected * 8,
                    key.len() * 8
                )));
            }
        }
        if !self.core.is_valid_key_length(key.len()) {
            return Err(CryptoError::InvalidLength(format!(
                "Key of size {} not supported by {}",
                key.len(),
                self.core.name()
            )));
        }

        self.key = Some(Zeroizing::new(key.to_vec()));
        self.changed = true;
        self.select_engine();
        Ok(())
    }

    /// Fixes the key length in bits.
    pub fn set_key_length(&mut self, bits: usize) -> Result<()> {
        let bytes = bits / 8;
        if bits % 8 != 0 || !self.core.is_valid_key_length(bytes) {
            return Err(CryptoError::InvalidLength(format!(
                "Key size of {} bits is not supported by {}",
                bits,
                self.core.name()
            )));
        }

        self.explicit_key_length = Some(bytes);
        if let Some(key) = &self.key {
            if key.len() != bytes {
                let current = key.len() * 8;
                self.key = None;
                self.changed = true;
                return Err(CryptoError::InconsistentSetup(format!(
                    "Key length is {} bits but {} bits were requested; the key has been cleared",
                    current, bits
                )));
            }
        }
        self.select_engine();
        Ok(())
    }

    pub fn set_iv(&mut self, iv: &[u8]) -> Result<()> {
        if !self.uses_iv() {
            let reason = match self.mode {
                Mode::Gcm => "GCM uses a nonce; use set_nonce instead".to_string(),
                mode => format!("{} mode does not use an IV", mode),
            };
            return Err(CryptoError::BadMode(reason));
        }
        if iv.len() != self.block_size {
            return Err(CryptoError::InvalidLength(format!(
                "Received initialization vector of size {}, but size {} is required",
                iv.len(),
                self.block_size
            )));
        }

        self.iv = Some(iv.to_vec());
        self.encrypt_changed = true;
        self.decrypt_changed = true;
        Ok(())
    }

    /// Sets the GCM nonce (any non-empty length) or the stream nonce.
    pub fn set_nonce(&mut self, nonce: &[u8]) -> Result<()> {
        match (&self.core, self.mode) {
            (Core::Block(_), Mode::Gcm) => {
                if nonce.is_empty() {
                    return Err(CryptoError::InvalidLength(
                        "GCM nonce must not be empty".into(),
                    ));
                }
            }
            (Core::Stream(prim), _) => match prim.nonce_length() {
                Some(len) if len == nonce.len() => {}
                Some(len) => {
                    return Err(CryptoError::InvalidLength(format!(
                        "Nonce of size {} not supported by {}; {} bytes are required",
                        nonce.len(),
                        prim.name(),
                        len
                    )))
                }
                None => {
                    return Err(CryptoError::BadMode(format!(
                        "{} does not use a nonce",
                        prim.name()
                    )))
                }
            },
            (Core::Block(_), mode) => {
                return Err(CryptoError::BadMode(format!(
                    "Nonces are only used in GCM mode, not {}",
                    mode
                )))
            }
        }

        self.nonce = Some(nonce.to_vec());
        self.encrypt_changed = true;
        self.decrypt_changed = true;
        self.select_engine();
        Ok(())
    }

    pub fn set_aad(&mut self, aad: &[u8]) -> Result<()> {
        if self.mode != Mode::Gcm && !self.poly1305 {
            return Err(CryptoError::BadMode(
                "Additional authenticated data is only used in GCM mode or with Poly1305".into(),
            ));
        }
        self.aad = aad.to_vec();
        self.select_engine();
        Ok(())
    }

    /// Derives the key (and the IV when the mode uses one) from a password.
    pub fn set_password(&mut self, password: &str, method: PasswordMethod) -> Result<()> {
        let key_len = self.key_length() / 8;
        let iv_len = self.uses_iv().then_some(self.block_size);
        let secret = derive_key(password, &method, key_len, iv_len)?;
        self.set_key(&secret.key)?;
        if let Some(iv) = &secret.iv {
            self.set_iv(iv)?;
        }
        Ok(())
    }

    /// Key derivation parameters built from the session's configured defaults.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams::from_defaults(&self.kdf)
    }

    pub fn enable_padding(&mut self) {
        self.padding = true;
    }

    pub fn disable_padding(&mut self) {
        self.padding = false;
    }

    /// Keeps chaining state across calls. A no-op in ECB; GCM is per message.
    pub fn enable_continuous_buffer(&mut self) -> Result<()> {
        self.set_continuous_buffer(true)
    }

    pub fn disable_continuous_buffer(&mut self) -> Result<()> {
        self.set_continuous_buffer(false)
    }

    fn set_continuous_buffer(&mut self, enabled: bool) -> Result<()> {
        match self.mode {
            Mode::Ecb => Ok(()),
            Mode::Gcm => Err(CryptoError::BadMode(
                "This mode does not run in continuous mode".into(),
            )),
            _ => {
                self.continuous_buffer = enabled;
                self.encrypt_changed = true;
                self.decrypt_changed = true;
                self.select_engine();
                Ok(())
            }
        }
    }

    /// Authenticates ciphertexts with Poly1305.
    ///
    /// Stream primitives that derive a one-time key (ChaCha20) need nothing
    /// else; block ciphers need [`set_poly1305_key`](Self::set_poly1305_key).
    pub fn enable_poly1305(&mut self) -> Result<()> {
        if self.mode == Mode::Gcm {
            return Err(CryptoError::BadMode(
                "Poly1305 cannot be used in GCM mode".into(),
            ));
        }
        self.poly1305 = true;
        self.restart_keystreams();
        Ok(())
    }

    pub fn set_poly1305_key(&mut self, key: &[u8]) -> Result<()> {
        if self.mode == Mode::Gcm {
            return Err(CryptoError::BadMode(
                "Poly1305 cannot be used in GCM mode".into(),
            ));
        }
        let key: [u8; 32] = key.try_into().map_err(|_| {
            CryptoError::InvalidLength(format!(
                "The Poly1305 key must be 32 bytes long, not {}",
                key.len()
            ))
        })?;
        self.poly1305_key = Some(Zeroizing::new(key));
        self.poly1305 = true;
        self.restart_keystreams();
        Ok(())
    }

    // 数据密钥流的起始块随Poly1305密钥来源变化，已打开的流不能续用
    fn restart_keystreams(&mut self) {
        self.release_handles();
        self.encrypt_changed = true;
        self.decrypt_changed = true;
    }

    /// Tries `engine` before the default order.
    pub fn set_preferred_engine(&mut self, engine: Engine) {
        self.preferred_engine = Some(engine);
        self.changed = true;
        self.select_engine();
    }

    // ---- queries ----

    /// Key length in bits.
    pub fn key_length(&self) -> usize {
        self.explicit_key_length
            .or_else(|| self.key.as_ref().map(|k| k.len()))
            .unwrap_or(self.default_key_length)
            * 8
    }

    /// Block length in bits; 0 for stream primitives.
    pub fn block_length(&self) -> usize {
        self.block_size * 8
    }

    pub fn block_length_in_bytes(&self) -> usize {
        self.block_size
    }

    pub fn uses_iv(&self) -> bool {
        matches!(self.core, Core::Block(_)) && self.mode.uses_iv()
    }

    pub fn uses_nonce(&self) -> bool {
        match &self.core {
            Core::Block(_) => self.mode == Mode::Gcm,
            Core::Stream(prim) => prim.nonce_length().is_some(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Currently selected engine.
    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Whether CTR runs as raw-block encryption of counter blocks.
    pub fn is_ctr_emulated(&self) -> bool {
        self.ctr_emulated
    }

    fn is_authenticated(&self) -> bool {
        self.mode.is_authenticated() || self.poly1305
    }

    // ---- engine selection ----

    /// Whether `engine` can run this session's cipher, mode and parameters.
    pub fn is_valid_engine(&self, engine: Engine) -> bool {
        let core = match &self.core {
            Core::Stream(_) => return engine == Engine::Portable,
            Core::Block(core) => core,
        };
        if !REGISTRY.supports(engine, core.as_dyn().name(), self.mode) {
            return false;
        }
        let built_in = matches!(core, BlockCore::Aes(_) | BlockCore::Sm4(_));
        match engine {
            Engine::Accelerated => {
                built_in
                    && (self.mode != Mode::Gcm
                        || self.nonce.as_ref().map_or(true, |n| n.len() == GCM_NONCE_LEN))
            }
            Engine::AcceleratedEcb | Engine::FastPath => built_in,
            Engine::Portable => true,
        }
    }

    fn select_engine(&mut self) {
        let chosen = self
            .preferred_engine
            .into_iter()
            .chain(Engine::DEFAULT_ORDER)
            .find(|engine| self.is_valid_engine(*engine))
            .unwrap_or(Engine::Portable);

        if let Some(preferred) = self.preferred_engine {
            if preferred != chosen {
                log::warn!(
                    "Preferred engine {} cannot run {} in {} mode; using {}",
                    preferred,
                    self.core.name(),
                    self.mode,
                    chosen
                );
            }
        }

        if chosen != self.engine {
            log::debug!(
                "Engine for {} in {} mode: {} -> {}",
                self.core.name(),
                self.mode,
                self.engine,
                chosen
            );
            self.release_handles();
            self.encrypt_changed = true;
            self.decrypt_changed = true;
        }

        self.engine = chosen;
        self.kernel = match (&self.core, chosen) {
            (Core::Block(core), Engine::FastPath) => fastpath::select_kernel(core, self.mode),
            _ => None,
        };
        self.ctr_emulated = chosen == Engine::AcceleratedEcb && self.mode == Mode::Ctr;
    }

    fn release_handles(&mut self) {
        if self.encrypt_handle.is_some() || self.decrypt_handle.is_some() {
            log::debug!("Released {} engine handles", self.engine);
        }
        self.encrypt_handle = None;
        self.decrypt_handle = None;
    }

    // ---- lazy setup ----

    fn setup(&mut self) -> Result<()> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| CryptoError::InsufficientSetup("No key has been defined".into()))?;

        if self.changed {
            if let Core::Block(core) = &mut self.core {
                core.as_dyn_mut().setup_key(key)?;
                self.hash_subkey = match self.mode {
                    Mode::Gcm => Some(Zeroizing::new(gcm::hash_subkey(core.as_dyn()))),
                    _ => None,
                };
            }
            self.changed = false;
            self.encrypt_changed = true;
            self.decrypt_changed = true;
            self.release_handles();
        }

        if self.uses_iv() && self.iv.is_none() {
            return Err(CryptoError::InsufficientSetup(
                "No IV has been defined".into(),
            ));
        }
        if self.uses_nonce() && self.nonce.is_none() {
            return Err(CryptoError::InsufficientSetup(
                "No nonce has been defined".into(),
            ));
        }
        Ok(())
    }

    fn block_core(&self) -> Result<&BlockCore> {
        match &self.core {
            Core::Block(core) => Ok(core),
            Core::Stream(_) => Err(CryptoError::InternalError(
                "block operation on a stream primitive".into(),
            )),
        }
    }

    fn key_bytes(&self) -> Result<&[u8]> {
        self.key
            .as_deref()
            .map(|k| k.as_slice())
            .ok_or_else(|| CryptoError::InsufficientSetup("No key has been defined".into()))
    }

    /// Starting state for a call: fresh from the original IV unless
    /// continuous buffering carries the previous call's state.
    fn take_state(&mut self, dir: Direction) -> ChainState {
        let (changed, state) = match dir {
            Direction::Encrypt => (&mut self.encrypt_changed, &mut self.encrypt_state),
            Direction::Decrypt => (&mut self.decrypt_changed, &mut self.decrypt_state),
        };
        if *changed || !self.continuous_buffer {
            *changed = false;
            return ChainState::new(self.iv.as_deref().unwrap_or(&[]));
        }
        std::mem::take(state)
    }

    fn commit_state(&mut self, dir: Direction, next: ChainState) {
        if self.continuous_buffer {
            match dir {
                Direction::Encrypt => self.encrypt_state = next,
                Direction::Decrypt => self.decrypt_state = next,
            }
        }
    }

    /// Handle slot of `dir`, emptied first if the direction was reset.
    fn handle_slot(&mut self, dir: Direction) -> &mut Option<LiveHandle> {
        let (changed, handle) = match dir {
            Direction::Encrypt => (&mut self.encrypt_changed, &mut self.encrypt_handle),
            Direction::Decrypt => (&mut self.decrypt_changed, &mut self.decrypt_handle),
        };
        if std::mem::replace(changed, false) {
            *handle = None;
        }
        handle
    }

    // ---- data path ----

    fn run_mode_engine(
        &self,
        mode: Mode,
        dir: Direction,
        state: ChainState,
        data: &[u8],
    ) -> Result<ModeOutput> {
        let core = self.block_core()?;
        match self.engine {
            Engine::AcceleratedEcb => modes::process(core.as_dyn(), mode, dir, state, data, true),
            Engine::FastPath => {
                let kernel = self.kernel.ok_or_else(|| {
                    CryptoError::InternalError("fast path selected without a kernel".into())
                })?;
                kernel(core, dir, state, data)
            }
            Engine::Accelerated | Engine::Portable => {
                modes::process(core.as_dyn(), mode, dir, state, data, false)
            }
        }
    }

    fn run_block_mode(&mut self, dir: Direction, data: &[u8]) -> Result<Vec<u8>> {
        if self.engine == Engine::Accelerated {
            return self.accelerated_ctr(dir, data);
        }
        let state = self.take_state(dir);
        let (out, next) = self.run_mode_engine(self.mode, dir, state, data)?;
        self.commit_state(dir, next);
        Ok(out)
    }

    fn accelerated_ctr(&mut self, dir: Direction, data: &[u8]) -> Result<Vec<u8>> {
        if self.mode != Mode::Ctr {
            return Err(CryptoError::InternalError(format!(
                "accelerated engine selected for {} mode",
                self.mode
            )));
        }
        let name = self.core.name();
        let key = Zeroizing::new(self.key_bytes()?.to_vec());
        let iv = self
            .iv
            .clone()
            .ok_or_else(|| CryptoError::InsufficientSetup("No IV has been defined".into()))?;

        let mut out = data.to_vec();
        if !self.continuous_buffer {
            accelerated::ctr_apply(name, &key, &iv, &mut out)?;
            return Ok(out);
        }

        let slot = self.handle_slot(dir);
        if slot.is_none() {
            *slot = Some(LiveHandle::Ctr(CtrHandle::new(name, &key, &iv)?));
            log::debug!("Opened accelerated CTR handle for {}", name);
        }
        match slot {
            Some(LiveHandle::Ctr(handle)) => handle.apply(&mut out),
            _ => {
                return Err(CryptoError::InternalError(
                    "accelerated CTR handle missing".into(),
                ))
            }
        }
        Ok(out)
    }

    fn run_stream(&mut self, dir: Direction, data: &[u8], start_block: u64) -> Result<Vec<u8>> {
        let key = Zeroizing::new(self.key_bytes()?.to_vec());
        let nonce = self.nonce.clone().unwrap_or_default();
        let keystream = |core: &Core| -> Result<Box<dyn Keystream>> {
            match core {
                Core::Stream(prim) => prim.keystream(&key, &nonce, start_block),
                Core::Block(_) => Err(CryptoError::InternalError(
                    "stream operation on a block primitive".into(),
                )),
            }
        };

        let mut out = data.to_vec();
        if !self.continuous_buffer {
            keystream(&self.core)?.apply_keystream(&mut out);
            return Ok(out);
        }

        let fresh = match dir {
            Direction::Encrypt => self.encrypt_changed || self.encrypt_handle.is_none(),
            Direction::Decrypt => self.decrypt_changed || self.decrypt_handle.is_none(),
        };
        let opened = if fresh { Some(keystream(&self.core)?) } else { None };
        let slot = self.handle_slot(dir);
        if let Some(stream) = opened {
            *slot = Some(LiveHandle::Stream(stream));
        }
        match slot {
            Some(LiveHandle::Stream(stream)) => stream.apply_keystream(&mut out),
            _ => {
                return Err(CryptoError::InternalError(
                    "stream keystream handle missing".into(),
                ))
            }
        }
        Ok(out)
    }

    fn poly1305_mac_key(&self) -> Result<Option<MacKey>> {
        if !self.poly1305 {
            return Ok(None);
        }
        if let Some(key) = &self.poly1305_key {
            return Ok(Some(MacKey::Explicit(key.clone())));
        }
        if let Core::Stream(prim) = &self.core {
            let nonce = self.nonce.as_deref().unwrap_or(&[]);
            if let Some(otk) = prim.poly1305_key(self.key_bytes()?, nonce)? {
                return Ok(Some(MacKey::Generated(otk)));
            }
        }
        Err(CryptoError::InsufficientSetup(
            "No Poly1305 key has been set".into(),
        ))
    }

    fn poly1305_tag(&self, mac_key: &MacKey, ciphertext: &[u8]) -> [u8; MAX_TAG_LEN] {
        match mac_key {
            MacKey::Explicit(key) if self.engine == Engine::Accelerated => {
                accelerated::poly1305_tag(key, &self.aad, ciphertext)
            }
            MacKey::Explicit(key) | MacKey::Generated(key) => {
                let mut mac = Poly1305::new(key);
                mac.update_padded(&self.aad);
                mac.update_padded(ciphertext);
                mac.update(&(self.aad.len() as u64).to_le_bytes());
                mac.update(&(ciphertext.len() as u64).to_le_bytes());
                mac.finalize()
            }
        }
    }

    fn gcm_pre_counter(&self) -> Result<([u8; 16], &[u8; 16])> {
        let h = self.hash_subkey.as_deref().ok_or_else(|| {
            CryptoError::InternalError("GHASH subkey has not been derived".into())
        })?;
        let nonce = self
            .nonce
            .as_deref()
            .ok_or_else(|| CryptoError::InsufficientSetup("No nonce has been defined".into()))?;
        Ok((gcm::pre_counter_block(h, nonce), h))
    }

    fn gcm_encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let (ciphertext, tag) = if self.engine == Engine::Accelerated {
            let mut buffer = plaintext.to_vec();
            let nonce = self.nonce.as_deref().unwrap_or(&[]);
            let tag = accelerated::gcm_seal(
                self.core.name(),
                self.key_bytes()?,
                nonce,
                &self.aad,
                &mut buffer,
            )?;
            (buffer, tag)
        } else {
            let (j0, h) = self.gcm_pre_counter()?;
            let mut counter = j0;
            gcm::inc32(&mut counter);
            let (ciphertext, _) = self.run_mode_engine(
                Mode::Gcm,
                Direction::Encrypt,
                ChainState::new(&counter),
                plaintext,
            )?;
            let s = gcm::ghash_aad_ciphertext(h, &self.aad, &ciphertext);
            let tag = gcm::finish_tag(self.block_core()?.as_dyn(), &j0, &s);
            (ciphertext, tag)
        };
        self.newtag = Some(tag);
        Ok(ciphertext)
    }

    fn gcm_decrypt(&mut self, ciphertext: &[u8], supplied: &[u8]) -> Result<Vec<u8>> {
        if self.engine == Engine::Accelerated {
            let mut buffer = ciphertext.to_vec();
            let nonce = self.nonce.as_deref().unwrap_or(&[]);
            let result = accelerated::gcm_open(
                self.core.name(),
                self.key_bytes()?,
                nonce,
                &self.aad,
                &mut buffer,
                supplied,
            );
            return match result {
                Ok(()) => Ok(buffer),
                Err(e) => {
                    buffer.zeroize();
                    Err(e)
                }
            };
        }

        let (j0, h) = self.gcm_pre_counter()?;
        let s = gcm::ghash_aad_ciphertext(h, &self.aad, ciphertext);
        let expected = gcm::finish_tag(self.block_core()?.as_dyn(), &j0, &s);
        if !tag_matches(&expected, supplied) {
            return Err(CryptoError::AuthenticationFailed);
        }

        let mut counter = j0;
        gcm::inc32(&mut counter);
        let (plaintext, _) = self.run_mode_engine(
            Mode::Gcm,
            Direction::Decrypt,
            ChainState::new(&counter),
            ciphertext,
        )?;
        Ok(plaintext)
    }

    /// Encrypts `plaintext`.
    ///
    /// In GCM or with Poly1305 enabled the tag is available from
    /// [`get_tag`](Self::get_tag) afterwards.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.setup()?;
        if self.mode == Mode::Gcm {
            return self.gcm_encrypt(plaintext);
        }

        let mac_key = self.poly1305_mac_key()?;
        let ciphertext = match self.mode {
            Mode::Stream => {
                let start = u64::from(matches!(mac_key, Some(MacKey::Generated(_))));
                self.run_stream(Direction::Encrypt, plaintext, start)?
            }
            mode => {
                let input: Cow<'_, [u8]> = if mode.is_paddable() && self.padding {
                    Cow::Owned(Pkcs7Padding::pad(plaintext, self.block_size)?)
                } else {
                    if mode.is_paddable() && plaintext.len() % self.block_size != 0 {
                        return Err(CryptoError::InvalidLength(format!(
                            "The plaintext's length ({}) is not a multiple of the block size ({}); try enabling padding",
                            plaintext.len(),
                            self.block_size
                        )));
                    }
                    Cow::Borrowed(plaintext)
                };
                self.run_block_mode(Direction::Encrypt, &input)?
            }
        };

        if let Some(key) = &mac_key {
            self.newtag = Some(self.poly1305_tag(key, &ciphertext));
        }
        Ok(ciphertext)
    }

    /// Decrypts `ciphertext`.
    ///
    /// In GCM or with Poly1305 enabled a tag must have been supplied with
    /// [`set_tag`](Self::set_tag); it is consumed by this call whatever the
    /// outcome. A mismatch yields [`CryptoError::AuthenticationFailed`] and
    /// no plaintext.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let oldtag = self.oldtag.take();
        self.setup()?;

        let supplied = if self.is_authenticated() {
            Some(oldtag.ok_or_else(|| {
                CryptoError::InsufficientSetup("No authentication tag has been set".into())
            })?)
        } else {
            None
        };

        if self.mode == Mode::Gcm {
            let supplied = supplied.unwrap_or_default();
            return self.gcm_decrypt(ciphertext, &supplied);
        }

        let mac_key = self.poly1305_mac_key()?;
        if let (Some(key), Some(supplied)) = (&mac_key, &supplied) {
            let expected = self.poly1305_tag(key, ciphertext);
            if !tag_matches(&expected, supplied) {
                return Err(CryptoError::AuthenticationFailed);
            }
        }

        match self.mode {
            Mode::Stream => {
                let start = u64::from(matches!(mac_key, Some(MacKey::Generated(_))));
                self.run_stream(Direction::Decrypt, ciphertext, start)
            }
            mode => {
                if mode.is_paddable() && ciphertext.len() % self.block_size != 0 {
                    return Err(CryptoError::InvalidLength(format!(
                        "The ciphertext's length ({}) must be a multiple of the block size ({})",
                        ciphertext.len(),
                        self.block_size
                    )));
                }
                let plaintext = self.run_block_mode(Direction::Decrypt, ciphertext)?;
                if mode.is_paddable() && self.padding {
                    Pkcs7Padding::unpad(&plaintext, self.block_size)
                } else {
                    Ok(plaintext)
                }
            }
        }
    }

    /// Returns the first `len` bytes (4 to 16) of the last tag produced by
    /// [`encrypt`](Self::encrypt).
    pub fn get_tag(&self, len: usize) -> Result<Vec<u8>> {
        if !self.is_authenticated() {
            return Err(CryptoError::BadMode(
                "Authentication tags are only available in GCM mode or with Poly1305".into(),
            ));
        }
        let tag = self.newtag.as_ref().ok_or_else(|| {
            CryptoError::InsufficientSetup(
                "A tag can only be returned after a round of encryption has been performed".into(),
            )
        })?;
        if !(MIN_TAG_LEN..=MAX_TAG_LEN).contains(&len) {
            return Err(CryptoError::InvalidLength(format!(
                "The authentication tag must be between {} and {} bytes long, not {}",
                MIN_TAG_LEN, MAX_TAG_LEN, len
            )));
        }
        Ok(tag[..len].to_vec())
    }

    /// Supplies the tag checked by the next [`decrypt`](Self::decrypt).
    pub fn set_tag(&mut self, tag: &[u8]) -> Result<()> {
        if !(MIN_TAG_LEN..=MAX_TAG_LEN).contains(&tag.len()) {
            return Err(CryptoError::InvalidLength(format!(
                "The authentication tag must be between {} and {} bytes long, not {}",
                MIN_TAG_LEN,
                MAX_TAG_LEN,
                tag.len()
            )));
        }
        if !self.is_authenticated() {
            return Err(CryptoError::BadMode(
                "Authentication tags are only used in GCM mode or with Poly1305".into(),
            ));
        }
        self.oldtag = Some(tag.to_vec());
        Ok(())
    }
}

impl Drop for Cipher {
    fn drop(&mut self) {
        self.release_handles();
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("cipher", &self.core.name())
            .field("mode", &self.mode)
            .field("engine", &self.engine)
            .field("key_length", &self.key_length())
            .field("continuous_buffer", &self.continuous_buffer)
            .field("padding", &self.padding)
            .field("poly1305", &self.poly1305)
            .finish_non_exhaustive()
    }
}
