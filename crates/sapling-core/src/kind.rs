//! Module: kind
//! Responsibility: validated kind naming and stable byte ordering contracts.
//! Does not own: key identifiers, ancestor paths, or row persistence.
//!
//! Invariants:
//! - Kind names are ASCII alphanumeric/underscore, non-empty, bounded.
//! - All construction paths validate invariants.
//! - Stored byte representation is canonical and order-preserving.
//! - Ordering semantics follow the length-prefixed stored-byte layout, not
//!   lexicographic string ordering.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{
    cmp::Ordering,
    fmt::{self, Display},
};
use thiserror::Error as ThisError;

pub(crate) const MAX_KIND_NAME_LEN: usize = 64;

///
/// KindNameError
///

#[derive(Debug, ThisError)]
pub enum KindNameError {
    #[error("kind name is empty")]
    Empty,

    #[error("kind name length {len} exceeds max {max}")]
    TooLong { len: usize, max: usize },

    #[error("kind name must be ASCII alphanumeric or '_'")]
    InvalidChar,
}

///
/// KindName
///
/// The name of an entity type. Derived from the entity declaration's
/// kind literal; every key carries one per path segment.
///

#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct KindName {
    len: u8,
    bytes: [u8; MAX_KIND_NAME_LEN],
}

impl KindName {
    /// Fixed encoded size in bytes (stable, protocol-level)
    pub const STORED_SIZE: usize = 1 + MAX_KIND_NAME_LEN;

    /// Validate and construct a kind name from one ASCII string.
    #[expect(clippy::cast_possible_truncation)]
    pub fn try_from_str(name: &str) -> Result<Self, KindNameError> {
        // Phase 1: validate user-visible identity constraints.
        let bytes = name.as_bytes();
        let len = bytes.len();

        if len == 0 {
            return Err(KindNameError::Empty);
        }
        if len > MAX_KIND_NAME_LEN {
            return Err(KindNameError::TooLong {
                len,
                max: MAX_KIND_NAME_LEN,
            });
        }
        if !bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            return Err(KindNameError::InvalidChar);
        }

        // Phase 2: write into fixed-size canonical storage.
        let mut out = [0u8; MAX_KIND_NAME_LEN];
        out[..len].copy_from_slice(bytes);

        Ok(Self {
            len: len as u8,
            bytes: out,
        })
    }

    #[must_use]
    /// Return the stored kind-name length.
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[must_use]
    /// Return whether the stored kind-name length is zero.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    /// Borrow raw identity bytes excluding trailing fixed-buffer padding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    #[must_use]
    /// Borrow the kind name as UTF-8 text.
    pub fn as_str(&self) -> &str {
        // Invariant: construction and decoding enforce ASCII-only storage,
        // so UTF-8 decoding cannot fail.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    #[must_use]
    /// Encode this identity into its fixed-size canonical representation.
    pub fn to_bytes(self) -> [u8; Self::STORED_SIZE] {
        let mut out = [0u8; Self::STORED_SIZE];
        out[0] = self.len;
        out[1..].copy_from_slice(&self.bytes);
        out
    }

    /// Decode one fixed-size canonical kind-name payload.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        // Phase 1: validate layout and payload bounds.
        if bytes.len() != Self::STORED_SIZE {
            return Err("corrupted kind name: invalid size");
        }

        let len = bytes[0] as usize;
        if len == 0 || len > MAX_KIND_NAME_LEN {
            return Err("corrupted kind name: invalid length");
        }
        if !bytes[1..=len]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            return Err("corrupted kind name: invalid character");
        }
        if bytes[1 + len..].iter().any(|&b| b != 0) {
            return Err("corrupted kind name: non-zero padding");
        }

        // Phase 2: materialize canonical fixed-buffer identity storage.
        let mut name = [0u8; MAX_KIND_NAME_LEN];
        name.copy_from_slice(&bytes[1..]);

        Ok(Self {
            len: bytes[0],
            bytes: name,
        })
    }
}

impl Ord for KindName {
    fn cmp(&self, other: &Self) -> Ordering {
        // Keep ordering consistent with `to_bytes()` (length prefix first).
        // This is deterministic protocol/storage ordering, not lexical string order.
        self.len.cmp(&other.len).then(self.bytes.cmp(&other.bytes))
    }
}

impl PartialOrd for KindName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<str> for KindName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for KindName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Display for KindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for KindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KindName({})", self.as_str())
    }
}

impl Serialize for KindName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for KindName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::try_from_str(&name).map_err(de::Error::custom)
    }
}

///
/// TESTS
///
