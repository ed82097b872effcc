// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Unknown mode, or an operation that the session's mode does not support.
    #[error("Bad mode: {0}")]
    BadMode(String),

    /// A required parameter (key, IV, nonce, tag) has not been provided.
    #[error("Insufficient setup: {0}")]
    InsufficientSetup(String),

    /// The requested parameter conflicts with one fixed earlier.
    #[error("Inconsistent setup: {0}")]
    InconsistentSetup(String),

    #[error("Invalid length: {0}")]
    InvalidLength(String),

    #[error("Algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),

    /// Decryption produced data that cannot be right (e.g. malformed padding).
    #[error("Bad decryption: {0}")]
    BadDecryption(String),

    /// Derived and supplied authentication tags differ.
    #[error("Authentication failed: derived and supplied authentication tags do not match")]
    AuthenticationFailed,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CryptoError {
    /// Whether the error means the ciphertext did not decrypt under the
    /// current key: invalid padding or a failed tag check.
    ///
    /// Callers that retry with another key should branch on this.
    pub fn is_bad_decryption(&self) -> bool {
        matches!(
            self,
            CryptoError::BadDecryption(_) | CryptoError::AuthenticationFailed
        )
    }
}

impl From<serde_json::Error> for CryptoError {
    fn from(error: serde_json::Error) -> Self {
        CryptoError::InvalidParameter(format!("configuration: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
