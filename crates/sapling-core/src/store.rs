use crate::{
    entity::Entity,
    error::{Error, ErrorClass, ErrorOrigin},
    key::Key,
    serialize::serialize,
};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};
use thiserror::Error as ThisError;

/// Max serialized bytes for a single row (protocol-level limit).
pub const MAX_ROW_BYTES: u32 = 1024 * 1024;

///
/// RawRowError
/// Construction / storage-boundary errors.
///

#[derive(Debug, ThisError)]
pub(crate) enum RawRowError {
    #[error("row exceeds max size: {len} bytes (limit {MAX_ROW_BYTES})")]
    TooLarge { len: usize },
}

impl From<RawRowError> for Error {
    fn from(err: RawRowError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Store, err.to_string())
    }
}

///
/// RawRow
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawRow(Vec<u8>);

impl RawRow {
    /// Construct a raw row from serialized bytes.
    pub(crate) fn try_new(bytes: Vec<u8>) -> Result<Self, RawRowError> {
        if bytes.len() > MAX_ROW_BYTES as usize {
            return Err(RawRowError::TooLarge { len: bytes.len() });
        }
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes (in-memory; bounded by construction).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode into an entity.
    pub fn try_decode<E: Entity>(&self) -> Result<E, Error> {
        crate::serialize::deserialize::<E>(&self.0)
            .map_err(|err| Error::store_corruption(format!("row failed to decode: {err}")))
    }
}

///
/// StoreOps
///
/// Monotonic operation counters, readable by tests. This is what makes
/// "build never touches the store" an observable property.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StoreOps {
    pub gets: u64,
    pub puts: u64,
    puts_by_kind: BTreeMap<String, u64>,
}

impl StoreOps {
    fn record_get(&mut self) {
        self.gets = self.gets.saturating_add(1);
    }

    fn record_put(&mut self, kind: &str) {
        self.puts = self.puts.saturating_add(1);
        let entry = self.puts_by_kind.entry(kind.to_string()).or_default();
        *entry = entry.saturating_add(1);
    }

    /// Puts recorded for one kind since the last reset.
    #[must_use]
    pub fn puts_for(&self, kind: &str) -> u64 {
        self.puts_by_kind.get(kind).copied().unwrap_or_default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

///
/// DataStore
///
/// Row store for one fixture harness: canonical key bytes to encoded
/// rows. `put` is idempotent on re-put (replace semantics); `get` is
/// the existence check the resolver relies on.
///

#[derive(Default)]
pub struct DataStore {
    rows: BTreeMap<Vec<u8>, RawRow>,
    ops: StoreOps,
}

impl DataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist an entity at its (fully resolved) key. Returns the
    /// plain key the row is now durably addressed by.
    pub fn put<E: Entity>(&mut self, entity: &E) -> Result<Key, Error> {
        let slot = entity.key();
        if slot.is_deferred() {
            return Err(Error::store_invariant(format!(
                "deferred key {} reached the write path",
                slot.key()
            )));
        }

        let key = slot.key().clone();
        if key.kind() != E::KIND {
            return Err(Error::store_invariant(format!(
                "kind mismatch: entity {} stored under key {key}",
                E::KIND
            )));
        }

        let row = RawRow::try_new(serialize(entity)?)?;
        self.rows.insert(key.to_bytes(), row);
        self.ops.record_put(key.kind().as_str());

        Ok(key)
    }

    /// Existence check / raw fetch.
    pub fn get(&mut self, key: &Key) -> Option<RawRow> {
        self.ops.record_get();
        self.rows.get(&key.to_bytes()).cloned()
    }

    /// Existence check without materializing the row.
    pub fn contains(&mut self, key: &Key) -> bool {
        self.ops.record_get();
        self.rows.contains_key(&key.to_bytes())
    }

    /// Fetch and decode the entity stored at `key`, if any.
    pub fn fetch<E: Entity>(&mut self, key: &Key) -> Result<Option<E>, Error> {
        if key.kind() != E::KIND {
            return Err(Error::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Store,
                format!("fetch kind mismatch: asked for {} at key {key}", E::KIND),
            ));
        }

        self.get(key).map(|row| row.try_decode::<E>()).transpose()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Clear all stored rows from the data store.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    #[must_use]
    pub const fn ops(&self) -> &StoreOps {
        &self.ops
    }

    pub fn reset_ops(&mut self) {
        self.ops.reset();
    }
}

///
/// StoreHandle
///
/// Shared single-threaded handle to one data store. Factories and the
/// resolver clone the handle; the harness owns the lifecycle. `Rc`
/// keeps the whole arrangement `!Send`, which is the concurrency
/// contract: one harness, one thread.
///

#[derive(Clone, Default)]
pub struct StoreHandle {
    inner: Rc<RefCell<DataStore>>,
}

impl StoreHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the store immutably.
    pub fn with<R>(&self, f: impl FnOnce(&DataStore) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Borrow the store mutably.
    ///
    /// Borrows are scoped to the closure; callers must not re-enter
    /// the handle from inside `f`.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut DataStore) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::KeySlot;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Deserialize, Serialize)]
    struct Widget {
        key: KeySlot,
        name: String,
    }

    entity_kind!(Widget, kind = "Widget", key = key);

    fn widget(id: i64, name: &str) -> Widget {
        Widget {
            key: Key::try_new("Widget", id).unwrap().into(),
            name: name.to_string(),
        }
    }

    #[test]
    fn put_then_fetch_round_trips() {
        let mut store = DataStore::new();
        let stored = store.put(&widget(1, "lathe")).unwrap();

        let back = store.fetch::<Widget>(&stored).unwrap().unwrap();
        assert_eq!(back.name, "lathe");
        assert_eq!(back.key, stored);
    }

    #[test]
    fn get_on_missing_key_returns_none() {
        let mut store = DataStore::new();
        let key = Key::try_new("Widget", 404).unwrap();
        assert!(store.get(&key).is_none());
        assert!(!store.contains(&key));
    }

    #[test]
    fn re_put_replaces_without_growing_the_store() {
        let mut store = DataStore::new();
        store.put(&widget(1, "first")).unwrap();
        store.put(&widget(1, "second")).unwrap();

        assert_eq!(store.len(), 1);
        let key = Key::try_new("Widget", 1).unwrap();
        let back = store.fetch::<Widget>(&key).unwrap().unwrap();
        assert_eq!(back.name, "second");
    }

    #[test]
    fn ops_count_puts_per_kind_and_gets() {
        let mut store = DataStore::new();
        store.put(&widget(1, "a")).unwrap();
        store.put(&widget(2, "b")).unwrap();
        let key = Key::try_new("Widget", 1).unwrap();
        store.get(&key);

        assert_eq!(store.ops().puts, 2);
        assert_eq!(store.ops().puts_for("Widget"), 2);
        assert_eq!(store.ops().gets, 1);

        store.reset_ops();
        assert_eq!(store.ops(), &StoreOps::default());
    }

    #[test]
    fn fetch_with_wrong_kind_is_rejected() {
        #[derive(Clone, Debug, Deserialize, Serialize)]
        struct Gadget {
            key: KeySlot,
        }
        entity_kind!(Gadget, kind = "Gadget", key = key);

        let mut store = DataStore::new();
        let stored = store.put(&widget(1, "a")).unwrap();

        let err = store.fetch::<Gadget>(&stored).unwrap_err();
        assert!(err.message.contains("kind mismatch"));
    }

    #[test]
    fn deferred_key_is_rejected_at_the_write_path() {
        use crate::slot::{EntitySource, KeyProxy};
        use std::{any::Any, rc::Rc};

        struct NullSource;

        impl EntitySource for NullSource {
            fn kind(&self) -> &'static str {
                "Widget"
            }

            fn build_at(self: Rc<Self>, key: &Key) -> Result<Box<dyn Any>, Error> {
                Err(Error::unresolved(format!("cannot build {key}")))
            }

            fn create_at(self: Rc<Self>, key: &Key) -> Result<Box<dyn Any>, Error> {
                Err(Error::unresolved(format!("cannot create {key}")))
            }
        }

        let key = Key::try_new("Widget", 1).unwrap();
        let entity = Widget {
            key: KeySlot::Deferred(KeyProxy::new(key, Rc::new(NullSource))),
            name: "deferred".to_string(),
        };

        let mut store = DataStore::new();
        let err = store.put(&entity).unwrap_err();
        assert_eq!(err.class, ErrorClass::InvariantViolation);
        assert!(err.message.contains("write path"));
        assert_eq!(store.ops().puts, 0);
    }

    #[test]
    fn kind_mismatch_at_put_is_rejected() {
        let mut store = DataStore::new();
        let entity = Widget {
            key: Key::try_new("Gadget", 1).unwrap().into(),
            name: "wrong".to_string(),
        };

        let err = store.put(&entity).unwrap_err();
        assert_eq!(err.class, ErrorClass::InvariantViolation);
    }

    #[test]
    fn handle_scopes_borrows_to_the_closure() {
        let handle = StoreHandle::new();
        handle.with_mut(|store| {
            store.put(&widget(1, "a")).unwrap();
        });

        let len = handle.with(DataStore::len);
        assert_eq!(len, 1);
    }
}
