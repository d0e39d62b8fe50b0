//! Zeroizing heap buffers for secret material
//!
//! A [`SecureBuffer`] owns a fixed-length allocation that is overwritten
//! with zeros when it is dropped. Drop runs on every exit path, including
//! `?` early returns, so callers never wipe by hand.
//!
//! The buffer never grows after allocation: reallocation would leave an
//! unwiped copy of the old contents behind.
//!
//! Pages are not locked in memory. Locking requires `unsafe` FFI, which this
//! crate forbids.

use std::fmt;

use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

/// Fixed-length, zeroize-on-drop byte buffer.
pub struct SecureBuffer {
    bytes: Zeroizing<Vec<u8>>,
}

impl SecureBuffer {
    /// Allocate `len` zero bytes.
    ///
    /// # Errors
    ///
    /// - `NoMemory`: the allocator refused the request
    pub fn acquire(len: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len).map_err(|_| CryptoError::NoMemory { requested: len })?;
        bytes.resize(len, 0);

        Ok(Self { bytes: Zeroizing::new(bytes) })
    }

    /// Allocate a buffer holding a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let mut buffer = Self::acquire(data.len())?;
        buffer.as_mut_slice().copy_from_slice(data);
        Ok(buffer)
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutably borrow the contents.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Copy the contents out into an ordinary vector.
    ///
    /// The copy is not wiped on drop; use only when the caller takes over
    /// responsibility for the bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Wipe and free the buffer now.
    pub fn release(self) {
        drop(self);
    }
}

impl AsRef<[u8]> for SecureBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBuffer").field("len", &self.len()).finish_non_exhaustive()
    }
}
