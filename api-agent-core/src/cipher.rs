//! Pluggable body cipher.
//!
//! A [`Cipher`] transforms the whole outgoing body before it is sent and the
//! whole incoming body when the server marks it as encrypted (see
//! [`CIPHER_ENCODED_HEADER`]). The agent never inspects the ciphertext.
//!
//! # Example
//!
//! ```
//! use api_agent_core::{Cipher, CipherError, SharedCipher};
//! use bytes::Bytes;
//!
//! struct Xor(u8);
//!
//! impl Cipher for Xor {
//!     fn encrypt(&self, data: &[u8]) -> Result<Bytes, CipherError> {
//!         Ok(data.iter().map(|b| b ^ self.0).collect::<Vec<_>>().into())
//!     }
//!
//!     fn decrypt(&self, data: &[u8]) -> Result<Bytes, CipherError> {
//!         self.encrypt(data)
//!     }
//! }
//!
//! let cipher = SharedCipher::new(Xor(0x5a));
//! let sealed = cipher.encrypt(b"hello").unwrap();
//! assert_eq!(cipher.decrypt(&sealed).unwrap(), Bytes::from_static(b"hello"));
//! ```

use bytes::Bytes;
use std::sync::Arc;

/// Response header signalling that the body must be decrypted.
///
/// The value is compared case-insensitively against `"true"`.
pub const CIPHER_ENCODED_HEADER: &str = "x-cipher-encoded";

/// Error returned by a [`Cipher`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CipherError(pub String);

impl CipherError {
    pub fn new(msg: impl Into<String>) -> Self {
        CipherError(msg.into())
    }
}

/// Encrypt/decrypt capability applied transparently to bodies.
pub trait Cipher: Send + Sync + 'static {
    /// Encrypt an outgoing body.
    fn encrypt(&self, data: &[u8]) -> Result<Bytes, CipherError>;

    /// Decrypt an incoming body.
    fn decrypt(&self, data: &[u8]) -> Result<Bytes, CipherError>;
}

/// A shared, type-erased cipher.
///
/// Cloning is cheap; all clones refer to the same cipher.
#[derive(Clone)]
pub struct SharedCipher(Arc<dyn Cipher>);

impl SharedCipher {
    pub fn new<C: Cipher>(cipher: C) -> Self {
        SharedCipher(Arc::new(cipher))
    }

    pub fn from_arc(cipher: Arc<dyn Cipher>) -> Self {
        SharedCipher(cipher)
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Bytes, CipherError> {
        self.0.encrypt(data)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Bytes, CipherError> {
        self.0.decrypt(data)
    }
}

impl<C: Cipher> From<C> for SharedCipher {
    fn from(cipher: C) -> Self {
        SharedCipher::new(cipher)
    }
}

impl std::fmt::Debug for SharedCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedCipher").finish_non_exhaustive()
    }
}
