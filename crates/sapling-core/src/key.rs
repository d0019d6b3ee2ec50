use crate::{
    MAX_KEY_DEPTH,
    error::{Error, ErrorClass, ErrorOrigin},
    kind::{KindName, KindNameError},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use thiserror::Error as ThisError;

pub(crate) const MAX_TEXT_ID_LEN: usize = 256;

///
/// KeyError
/// Construction boundary; the store forbids these shapes outright.
///

#[derive(Debug, ThisError)]
pub enum KeyError {
    #[error("key id 0 is not storable")]
    ZeroId,

    #[error("text key id is empty")]
    EmptyTextId,

    #[error("text key id length {len} exceeds max {max}")]
    TextIdTooLong { len: usize, max: usize },

    #[error("invalid kind name: {0}")]
    Kind(#[from] KindNameError),

    #[error("ancestor path depth {depth} exceeds max {max}")]
    PathTooDeep { depth: usize, max: usize },
}

impl From<KeyError> for Error {
    fn from(err: KeyError) -> Self {
        Self::invalid_key(err.to_string())
    }
}

///
/// KeyDecodeError
/// (decode / corruption boundary)
///

#[derive(Debug, ThisError)]
pub enum KeyDecodeError {
    #[error("corrupted key: {0}")]
    Corrupt(&'static str),

    #[error("decoded key is invalid: {0}")]
    Invalid(#[from] KeyError),
}

impl From<KeyDecodeError> for Error {
    fn from(err: KeyDecodeError) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Key, err.to_string())
    }
}

///
/// KeyId
///
/// The identifier component of one path segment. Integer ids are the
/// default the sequence generator produces; text ids are caller-pinned.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum KeyId {
    Int(i64),
    Text(String),
}

impl KeyId {
    // ── Variant tags (do not reorder) ─────────────────
    const TAG_INT: u8 = 0;
    const TAG_TEXT: u8 = 1;

    const INT_SIZE: usize = 8;

    const fn tag(&self) -> u8 {
        match self {
            Self::Int(_) => Self::TAG_INT,
            Self::Text(_) => Self::TAG_TEXT,
        }
    }

    /// Validate storability; the store rejects id 0 and empty text.
    pub fn validate(&self) -> Result<(), KeyError> {
        match self {
            Self::Int(0) => Err(KeyError::ZeroId),
            Self::Int(_) => Ok(()),
            Self::Text(text) if text.is_empty() => Err(KeyError::EmptyTextId),
            Self::Text(text) if text.len() > MAX_TEXT_ID_LEN => Err(KeyError::TextIdTooLong {
                len: text.len(),
                max: MAX_TEXT_ID_LEN,
            }),
            Self::Text(_) => Ok(()),
        }
    }

    fn write_bytes(&self, buf: &mut Vec<u8>) {
        buf.push(self.tag());

        match self {
            Self::Int(v) => {
                // Flip sign bit to preserve ordering in lexicographic bytes.
                let biased = v.cast_unsigned() ^ (1u64 << 63);
                buf.extend_from_slice(&biased.to_be_bytes());
            }
            Self::Text(text) => {
                // Bounded by validation; the cast cannot truncate.
                #[expect(clippy::cast_possible_truncation)]
                let len = text.len() as u16;
                buf.extend_from_slice(&len.to_be_bytes());
                buf.extend_from_slice(text.as_bytes());
            }
        }
    }

    fn read_bytes(input: &mut &[u8]) -> Result<Self, KeyDecodeError> {
        let (&tag, rest) = input
            .split_first()
            .ok_or(KeyDecodeError::Corrupt("missing id tag"))?;

        match tag {
            Self::TAG_INT => {
                if rest.len() < Self::INT_SIZE {
                    return Err(KeyDecodeError::Corrupt("truncated int id"));
                }
                let mut buf = [0u8; Self::INT_SIZE];
                buf.copy_from_slice(&rest[..Self::INT_SIZE]);
                let biased = u64::from_be_bytes(buf);
                *input = &rest[Self::INT_SIZE..];

                Ok(Self::Int((biased ^ (1u64 << 63)).cast_signed()))
            }

            Self::TAG_TEXT => {
                if rest.len() < 2 {
                    return Err(KeyDecodeError::Corrupt("truncated text id length"));
                }
                let len = usize::from(u16::from_be_bytes([rest[0], rest[1]]));
                let rest = &rest[2..];
                if rest.len() < len {
                    return Err(KeyDecodeError::Corrupt("truncated text id"));
                }
                let text = std::str::from_utf8(&rest[..len])
                    .map_err(|_| KeyDecodeError::Corrupt("text id is not UTF-8"))?
                    .to_string();
                *input = &rest[len..];

                Ok(Self::Text(text))
            }

            _ => Err(KeyDecodeError::Corrupt("invalid id tag")),
        }
    }
}

impl Ord for KeyId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Ord::cmp(a, b),
            // Match encoded bytes: length prefix first, then contents.
            (Self::Text(a), Self::Text(b)) => {
                Ord::cmp(&a.len(), &b.len()).then_with(|| Ord::cmp(a, b))
            }
            _ => Ord::cmp(&self.tag(), &other.tag()),
        }
    }
}

impl PartialOrd for KeyId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(Ord::cmp(self, other))
    }
}

/// Implements `From<T> for KeyId` for simple conversions
macro_rules! impl_from_key_id {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for KeyId {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    }
}

impl_from_key_id! {
    i8  => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8  => Int,
    u16 => Int,
    u32 => Int,
    &str => Text,
    String => Text,
}

///
/// Key
///
/// Immutable address of one entity: kind, id, and an optional parent
/// chain forming the ancestor path. Two keys are equal iff kind, id,
/// and the full parent chain are equal. Construction validates every
/// segment; a `Key` value is storable by definition.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "KeyRepr")]
pub struct Key {
    kind: KindName,
    id: KeyId,
    parent: Option<Box<Key>>,
}

impl Key {
    /// Construct a root key (no parent).
    pub fn try_new(kind: &str, id: impl Into<KeyId>) -> Result<Self, KeyError> {
        Self::build(kind, id.into(), None)
    }

    /// Construct a child key underneath an existing parent key.
    pub fn try_with_parent(kind: &str, id: impl Into<KeyId>, parent: Self) -> Result<Self, KeyError> {
        Self::build(kind, id.into(), Some(Box::new(parent)))
    }

    fn build(kind: &str, id: KeyId, parent: Option<Box<Self>>) -> Result<Self, KeyError> {
        let kind = KindName::try_from_str(kind)?;
        id.validate()?;

        let key = Self { kind, id, parent };
        let depth = key.depth();
        if depth > MAX_KEY_DEPTH {
            return Err(KeyError::PathTooDeep {
                depth,
                max: MAX_KEY_DEPTH,
            });
        }

        Ok(key)
    }

    #[must_use]
    pub const fn kind(&self) -> KindName {
        self.kind
    }

    #[must_use]
    pub const fn id(&self) -> &KeyId {
        &self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    /// Number of segments in the ancestor path, including this key.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.ancestors().count()
    }

    /// Walk the parent chain from the immediate parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(self.parent(), |key| key.parent())
    }

    /// The root segment of the ancestor path (`self` for root keys).
    #[must_use]
    pub fn root(&self) -> &Self {
        self.ancestors().last().unwrap_or(self)
    }

    fn segments(&self) -> Vec<&Self> {
        // Root-first segment order; both encoding and Ord rely on it.
        let mut path: Vec<&Self> = std::iter::once(self).chain(self.ancestors()).collect();
        path.reverse();
        path
    }

    #[must_use]
    /// Encode into the canonical root-first path representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for segment in self.segments() {
            buf.extend_from_slice(&segment.kind.to_bytes());
            segment.id.write_bytes(&mut buf);
        }

        buf
    }

    /// Decode a canonical path encoding produced by [`Self::to_bytes`].
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, KeyDecodeError> {
        let mut input = bytes;
        let mut key: Option<Self> = None;
        let mut depth = 0usize;

        while !input.is_empty() {
            depth += 1;
            if depth > MAX_KEY_DEPTH {
                return Err(KeyError::PathTooDeep {
                    depth,
                    max: MAX_KEY_DEPTH,
                }
                .into());
            }

            if input.len() < KindName::STORED_SIZE {
                return Err(KeyDecodeError::Corrupt("truncated kind name"));
            }
            let kind = KindName::try_from_bytes(&input[..KindName::STORED_SIZE])
                .map_err(KeyDecodeError::Corrupt)?;
            input = &input[KindName::STORED_SIZE..];

            let id = KeyId::read_bytes(&mut input)?;
            id.validate()?;

            key = Some(Self {
                kind,
                id,
                parent: key.map(Box::new),
            });
        }

        key.ok_or(KeyDecodeError::Corrupt("empty key encoding"))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        // Root-first segment comparison; ancestors sort before descendants.
        // Consistent with `to_bytes()` ordering.
        let a = self.segments();
        let b = other.segments();

        for (left, right) in a.iter().zip(&b) {
            let ord = Ord::cmp(&left.kind, &right.kind).then_with(|| Ord::cmp(&left.id, &right.id));
            if ord != Ordering::Equal {
                return ord;
            }
        }

        Ord::cmp(&a.len(), &b.len())
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(Ord::cmp(self, other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, segment) in self.segments().iter().enumerate() {
            if pos > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}:{}", segment.kind, segment.id)?;
        }

        Ok(())
    }
}

///
/// KeyRepr
///
/// Deserialization surface for `Key`; re-runs construction validation
/// so decoded rows cannot smuggle in unstorable keys.
///

#[derive(Deserialize)]
struct KeyRepr {
    kind: String,
    id: KeyId,
    parent: Option<Box<KeyRepr>>,
}

impl TryFrom<KeyRepr> for Key {
    type Error = KeyError;

    fn try_from(repr: KeyRepr) -> Result<Self, KeyError> {
        let parent = repr
            .parent
            .map(|p| Self::try_from(*p).map(Box::new))
            .transpose()?;

        Self::build(&repr.kind, repr.id, parent)
    }
}

///
/// TESTS
///
