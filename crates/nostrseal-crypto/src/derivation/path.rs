//! Derivation paths and child indices

use std::{fmt, str::FromStr};

use crate::error::{CryptoError, Result};

/// Bit marking an index as hardened
pub const HARDENED_BIT: u32 = 1 << 31;

/// Deepest path accepted (BIP-32 stores depth in one byte)
pub const MAX_DEPTH: usize = 255;

/// One step of a derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildIndex(u32);

impl ChildIndex {
    /// Hardened child `index`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: `index` already has the hardened bit set
    pub fn hardened(index: u32) -> Result<Self> {
        Self::check_unmarked(index)?;
        Ok(Self(index | HARDENED_BIT))
    }

    /// Normal (non-hardened) child `index`.
    pub fn normal(index: u32) -> Result<Self> {
        Self::check_unmarked(index)?;
        Ok(Self(index))
    }

    /// Wrap a raw wire value; bit 31 selects hardened derivation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw wire value including the hardened bit.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Index without the hardened bit.
    pub fn index(self) -> u32 {
        self.0 & !HARDENED_BIT
    }

    /// Returns true for hardened indices.
    pub fn is_hardened(self) -> bool {
        self.0 & HARDENED_BIT != 0
    }

    fn check_unmarked(index: u32) -> Result<()> {
        if index & HARDENED_BIT != 0 {
            return Err(CryptoError::invalid_argument(format!(
                "child index {index} exceeds {}",
                HARDENED_BIT - 1
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hardened() {
            write!(f, "{}'", self.index())
        } else {
            write!(f, "{}", self.index())
        }
    }
}

/// Ordered list of child indices, applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    indices: Vec<ChildIndex>,
}

impl DerivationPath {
    /// Empty path (the master key).
    pub fn master() -> Self {
        Self::default()
    }

    /// Build a path from raw wire values.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: more than [`MAX_DEPTH`] indices
    pub fn from_raw(raw: &[u32]) -> Result<Self> {
        let mut path = Self::master();
        for &index in raw {
            path.push(ChildIndex::from_raw(index))?;
        }
        Ok(path)
    }

    /// Append one step.
    pub fn push(&mut self, index: ChildIndex) -> Result<()> {
        if self.indices.len() >= MAX_DEPTH {
            return Err(CryptoError::invalid_argument(format!(
                "derivation path deeper than {MAX_DEPTH}"
            )));
        }
        self.indices.push(index);
        Ok(())
    }

    /// Copy of this path extended by one step.
    pub fn child(&self, index: ChildIndex) -> Result<Self> {
        let mut path = self.clone();
        path.push(index)?;
        Ok(path)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true for the master path.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Steps in application order.
    pub fn as_slice(&self) -> &[ChildIndex] {
        &self.indices
    }

    /// Iterate over steps in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChildIndex> {
        self.indices.iter()
    }
}

impl<'a> IntoIterator for &'a DerivationPath {
    type Item = &'a ChildIndex;
    type IntoIter = std::slice::Iter<'a, ChildIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromStr for DerivationPath {
    type Err = CryptoError;

    /// Parse `m/44'/1237'/0'/0/0`. `'`, `h` and `H` all mark hardened steps.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('/');

        match parts.next() {
            Some("m" | "M") => {},
            _ => return Err(CryptoError::invalid_argument("derivation path must start with 'm'")),
        }

        let mut path = Self::master();
        for part in parts {
            let (digits, hardened) = match part.strip_suffix(['\'', 'h', 'H']) {
                Some(digits) => (digits, true),
                None => (part, false),
            };

            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CryptoError::invalid_argument(format!(
                    "invalid path component '{part}'"
                )));
            }
            let index: u32 = digits.parse().map_err(|_| {
                CryptoError::invalid_argument(format!("path component '{part}' out of range"))
            })?;

            let child =
                if hardened { ChildIndex::hardened(index)? } else { ChildIndex::normal(index)? };
            path.push(child)?;
        }

        Ok(path)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.indices {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}
