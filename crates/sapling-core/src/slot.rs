use crate::{
    entity::Entity,
    error::Error,
    key::Key,
    store::StoreHandle,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser};
use std::{
    any::Any,
    fmt::{self, Display},
    hash::{Hash, Hasher},
    rc::Rc,
};

///
/// EntitySource
///
/// The seam between a key and the factory able to materialize the
/// entity that key addresses. Implemented by `Factory` in
/// `sapling-fixture`; the store side only ever sees this narrow
/// interface.
///

pub trait EntitySource: 'static {
    /// Kind produced by this source.
    fn kind(&self) -> &'static str;

    /// Build the entity addressed by `key` in memory. Never touches
    /// the store. The erased value downcasts to the source's entity type.
    fn build_at(self: Rc<Self>, key: &Key) -> Result<Box<dyn Any>, Error>;

    /// Build and durably create the entity addressed by `key`,
    /// resolving its own deferred references first. Returns the
    /// persisted entity.
    fn create_at(self: Rc<Self>, key: &Key) -> Result<Box<dyn Any>, Error>;
}

///
/// KeyProxy
///
/// A deferred stand-in for a real key: the key value itself plus the
/// source able to materialize the entity it addresses. Construction is
/// side-effect free; the store is only touched when `materialize` is
/// invoked or when create-time resolution consumes the proxy. A proxy
/// is never persisted.
///

#[derive(Clone)]
pub struct KeyProxy {
    key: Key,
    parent: Option<Box<KeySlot>>,
    source: Rc<dyn EntitySource>,
}

impl KeyProxy {
    #[must_use]
    pub const fn new(key: Key, source: Rc<dyn EntitySource>) -> Self {
        Self {
            key,
            parent: None,
            source,
        }
    }

    /// Bind a proxy whose parent entity is itself still deferred; the
    /// parent slot is retained so create-time resolution can
    /// materialize the parent before this key is considered final.
    /// `key` must already carry the parent's key in its ancestor path.
    #[must_use]
    pub fn with_deferred_parent(key: Key, source: Rc<dyn EntitySource>, parent: KeySlot) -> Self {
        Self {
            key,
            parent: Some(Box::new(parent)),
            source,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    #[must_use]
    pub const fn source(&self) -> &Rc<dyn EntitySource> {
        &self.source
    }

    /// The retained parent slot, when the parent was supplied deferred.
    #[must_use]
    pub fn deferred_parent(&self) -> Option<&KeySlot> {
        self.parent.as_deref()
    }

    /// Materialize the entity this proxy addresses: in memory when
    /// `create` is false, built-and-persisted when true.
    pub fn materialize(&self, create: bool) -> Result<Box<dyn Any>, Error> {
        let source = Rc::clone(&self.source);
        if create {
            source.create_at(&self.key)
        } else {
            source.build_at(&self.key)
        }
    }

    /// Typed variant of [`Self::materialize`].
    pub fn materialize_as<E: Entity>(&self, create: bool) -> Result<E, Error> {
        self.materialize(create)?.downcast::<E>().map(|e| *e).map_err(|_| {
            Error::resolver_internal(format!(
                "materialized entity for {} is not of kind {}",
                self.key,
                E::KIND
            ))
        })
    }
}

impl fmt::Debug for KeyProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyProxy")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

///
/// KeySlot
///
/// The value of every key-typed entity field. Behaves like the plain
/// key it carries for equality, display, and hashing; a `Deferred`
/// slot additionally knows how to materialize its entity. Create-time
/// resolution rewrites deferred slots to `Resolved` before anything
/// reaches the store.
///

#[derive(Clone, Debug)]
pub enum KeySlot {
    Resolved(Key),
    Deferred(KeyProxy),
}

impl KeySlot {
    /// The underlying plain key, whichever state the slot is in.
    #[must_use]
    pub const fn key(&self) -> &Key {
        match self {
            Self::Resolved(key) => key,
            Self::Deferred(proxy) => proxy.key(),
        }
    }

    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    #[must_use]
    pub const fn proxy(&self) -> Option<&KeyProxy> {
        match self {
            Self::Resolved(_) => None,
            Self::Deferred(proxy) => Some(proxy),
        }
    }

    /// Read the addressed entity back from the store.
    pub fn fetch<E: Entity>(&self, store: &StoreHandle) -> Result<Option<E>, Error> {
        store.with_mut(|s| s.fetch::<E>(self.key()))
    }
}

impl From<Key> for KeySlot {
    fn from(key: Key) -> Self {
        Self::Resolved(key)
    }
}

impl PartialEq for KeySlot {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for KeySlot {}

impl PartialEq<Key> for KeySlot {
    fn eq(&self, other: &Key) -> bool {
        self.key() == other
    }
}

impl PartialEq<KeySlot> for Key {
    fn eq(&self, other: &KeySlot) -> bool {
        other == self
    }
}

impl Hash for KeySlot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Display for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self.key(), f)
    }
}

impl Serialize for KeySlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Boundary guard: deferred slots must never reach persisted
        // rows; resolution rewrites them first.
        match self {
            Self::Resolved(key) => key.serialize(serializer),
            Self::Deferred(proxy) => Err(ser::Error::custom(format!(
                "deferred key {} reached the serialization boundary",
                proxy.key()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for KeySlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Key::deserialize(deserializer).map(Self::Resolved)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSource;

    impl EntitySource for NullSource {
        fn kind(&self) -> &'static str {
            "Null"
        }

        fn build_at(self: Rc<Self>, key: &Key) -> Result<Box<dyn Any>, Error> {
            Err(Error::unresolved(format!("null source cannot build {key}")))
        }

        fn create_at(self: Rc<Self>, key: &Key) -> Result<Box<dyn Any>, Error> {
            Err(Error::unresolved(format!("null source cannot create {key}")))
        }
    }

    fn deferred(kind: &str, id: i64) -> KeySlot {
        let key = Key::try_new(kind, id).unwrap();
        KeySlot::Deferred(KeyProxy::new(key, Rc::new(NullSource)))
    }

    #[test]
    fn slot_equality_compares_underlying_keys() {
        let key = Key::try_new("User", 1).unwrap();
        let resolved = KeySlot::Resolved(key.clone());
        let proxied = deferred("User", 1);

        assert_eq!(resolved, proxied);
        assert_eq!(proxied, key);
        assert_eq!(key, proxied);
        assert_ne!(proxied, deferred("User", 2));
    }

    #[test]
    fn deferred_slot_is_rejected_at_the_serialization_boundary() {
        let err = serde_json::to_string(&deferred("User", 1)).unwrap_err();
        assert!(err.to_string().contains("serialization boundary"));
    }

    #[test]
    fn resolved_slot_serializes_as_its_key() {
        let key = Key::try_new("User", 7).unwrap();
        let json = serde_json::to_string(&KeySlot::Resolved(key.clone())).unwrap();

        let back: KeySlot = serde_json::from_str(&json).unwrap();
        assert!(!back.is_deferred());
        assert_eq!(back, key);
    }

    #[test]
    fn proxy_construction_has_no_side_effects() {
        // A proxy over a source that fails on any materialization can
        // still be constructed, displayed, and compared freely.
        let slot = deferred("User", 3);
        assert!(slot.is_deferred());
        assert_eq!(slot.to_string(), "User:3");

        let err = slot.proxy().unwrap().materialize(false).unwrap_err();
        assert!(err.is_unresolved());
    }
}
