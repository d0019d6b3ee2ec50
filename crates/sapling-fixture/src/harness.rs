use crate::{
    error::FixtureError,
    factory::{Factory, FixtureDefinition},
};
use sapling_core::{entity::Entity, error::Error, store::StoreHandle};
use std::{
    any::{Any, TypeId},
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

///
/// AnyFactory
///
/// Type-erased registry entry; the typed factory is recovered by
/// downcast when a definition is looked up again.
///

pub(crate) trait AnyFactory: 'static {
    fn kind(&self) -> &'static str;
    fn reset_sequence(&self);
    fn as_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<D: FixtureDefinition> AnyFactory for Factory<D> {
    fn kind(&self) -> &'static str {
        D::Entity::KIND
    }

    fn reset_sequence(&self) {
        self.sequence().reset();
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

///
/// HarnessCore
///
/// Shared state behind one harness: the store handle and the registry
/// of live factories, keyed by definition type. This is the explicit
/// home of what would otherwise be ambient per-class globals; its
/// lifetime is the harness's lifetime.
///

pub(crate) struct HarnessCore {
    store: StoreHandle,
    registry: RefCell<HashMap<TypeId, Rc<dyn AnyFactory>>>,
    weak_self: Weak<Self>,
}

impl HarnessCore {
    pub(crate) fn store_handle(&self) -> StoreHandle {
        self.store.clone()
    }

    /// Look up the factory for `D`, creating and registering it on
    /// first use.
    pub(crate) fn factory_core<D: FixtureDefinition>(&self) -> Result<Rc<Factory<D>>, Error> {
        let type_id = TypeId::of::<D>();

        let existing = self.registry.borrow().get(&type_id).cloned();
        if let Some(entry) = existing {
            return entry.as_any().downcast::<Factory<D>>().map_err(|_| {
                FixtureError::DefinitionMismatch {
                    kind: D::Entity::KIND,
                }
                .into()
            });
        }

        let factory = Rc::new(Factory::<D>::new(self.weak_self.clone()));
        self.registry
            .borrow_mut()
            .insert(type_id, Rc::clone(&factory) as Rc<dyn AnyFactory>);

        Ok(factory)
    }

    fn register_strict<D: FixtureDefinition>(&self) -> Result<Rc<Factory<D>>, Error> {
        if self.registry.borrow().contains_key(&TypeId::of::<D>()) {
            return Err(FixtureError::DuplicateDefinition {
                kind: D::Entity::KIND,
            }
            .into());
        }

        self.factory_core::<D>()
    }
}

///
/// FixtureHarness
///
/// Owns one store and one factory per definition for the duration of a
/// test. Dropping the harness invalidates its factories; resetting it
/// restores cross-run determinism (sequences rewound, store emptied).
///

pub struct FixtureHarness {
    core: Rc<HarnessCore>,
}

impl FixtureHarness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(StoreHandle::new())
    }

    /// A harness persisting into an existing store handle.
    #[must_use]
    pub fn with_store(store: StoreHandle) -> Self {
        let core = Rc::new_cyclic(|weak| HarnessCore {
            store,
            registry: RefCell::new(HashMap::new()),
            weak_self: weak.clone(),
        });

        Self { core }
    }

    #[must_use]
    pub fn store(&self) -> StoreHandle {
        self.core.store_handle()
    }

    /// The factory for `D`, created and registered on first use.
    pub fn factory<D: FixtureDefinition>(&self) -> Result<Rc<Factory<D>>, Error> {
        self.core.factory_core::<D>()
    }

    /// Register `D` explicitly; errors if it already is.
    pub fn register<D: FixtureDefinition>(&self) -> Result<Rc<Factory<D>>, Error> {
        self.core.register_strict::<D>()
    }

    /// Rewind every registered factory's sequence.
    pub fn reset_sequences(&self) {
        for factory in self.core.registry.borrow().values() {
            factory.reset_sequence();
        }
    }

    /// Full reset: sequences rewound, store emptied, ops zeroed.
    pub fn reset(&self) {
        self.reset_sequences();
        self.store().with_mut(|store| {
            store.clear();
            store.reset_ops();
        });
    }
}

impl Default for FixtureHarness {
    fn default() -> Self {
        Self::new()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::UserFixture;
    use sapling_core::key::KeyId;

    #[test]
    fn factory_lookup_returns_the_same_instance() {
        let harness = FixtureHarness::new();
        let a = harness.factory::<UserFixture>().unwrap();
        let b = harness.factory::<UserFixture>().unwrap();

        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let harness = FixtureHarness::new();
        harness.register::<UserFixture>().unwrap();

        let err = harness.register::<UserFixture>().unwrap_err();
        assert!(err.message.contains("already registered"));
    }

    #[test]
    fn reset_restores_cross_run_determinism() {
        let harness = FixtureHarness::new();
        let users = harness.factory::<UserFixture>().unwrap();

        let first_run = users.create().unwrap();
        harness.reset();
        let second_run = users.create().unwrap();

        assert_eq!(first_run.key, second_run.key);
        assert_eq!(second_run.key.key().id(), &KeyId::Int(1));
        harness.store().with(|store| assert_eq!(store.len(), 1));
    }

    #[test]
    fn harnesses_can_share_one_store() {
        let store = StoreHandle::new();
        let first = FixtureHarness::with_store(store.clone());
        let second = FixtureHarness::with_store(store.clone());

        first
            .factory::<UserFixture>()
            .unwrap()
            .create()
            .unwrap();
        second
            .factory::<UserFixture>()
            .unwrap()
            .create_with(crate::overrides::Overrides::new().id(2))
            .unwrap();

        store.with(|s| assert_eq!(s.len(), 2));
    }
}
