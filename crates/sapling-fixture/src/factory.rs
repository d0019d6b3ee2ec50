use crate::{
    attribute,
    error::FixtureError,
    harness::HarnessCore,
    overrides::Overrides,
    resolver,
    sequence::Sequence,
};
use sapling_core::{
    entity::Entity,
    error::Error,
    key::{Key, KeyId},
    slot::{EntitySource, KeyProxy, KeySlot},
};
use std::{
    any::Any,
    marker::PhantomData,
    rc::{Rc, Weak},
};

///
/// Strategy
///
/// Build : in-memory only; the store is never touched.
/// Create : in-memory, then resolve deferred references and persist.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    Build,
    Create,
}

///
/// FixtureDefinition
///
/// One fixture blueprint: names the entity type and fills its non-key
/// fields. Key generation is injected by [`Factory`]; definitions never
/// write key plumbing. `ctx.key()` is the generated slot, bound to the
/// factory running this definition, and `ctx.reference` hands out
/// deferred slots to other definitions' output.
///

pub trait FixtureDefinition: 'static {
    type Entity: Entity;

    /// First value the factory's sequence yields. The store forbids
    /// id 0, so this is 1 unless a definition overrides it upward.
    const FIRST_SEQUENCE: i64 = 1;

    fn populate(ctx: &BuildContext<'_>) -> Result<Self::Entity, Error>;
}

///
/// BuildContext
///
/// Per-instance view a definition populates from: the generated key
/// slot, the ordinal parameterizing this instance, and access to the
/// harness for cross-definition references.
///

pub struct BuildContext<'a> {
    slot: KeySlot,
    ordinal: i64,
    harness: &'a Rc<HarnessCore>,
}

impl BuildContext<'_> {
    /// The generated key slot for this instance.
    #[must_use]
    pub fn key(&self) -> KeySlot {
        self.slot.clone()
    }

    /// The ordinal parameterizing this instance: the sequence draw
    /// backing the default id. For calls pinned to an integer id, the
    /// pinned value; for text-pinned ids, the next unclaimed draw
    /// (left unclaimed).
    #[must_use]
    pub const fn sequence(&self) -> i64 {
        self.ordinal
    }

    /// A deferred slot addressing another definition's output. The
    /// referenced entity is materialized automatically at create time
    /// if it does not already exist.
    pub fn reference<D: FixtureDefinition>(&self) -> Result<KeySlot, Error> {
        self.reference_with::<D>(Overrides::new())
    }

    /// [`Self::reference`] with pinned coordinates. Unpinned reference
    /// ids default to this instance's ordinal, so the n-th referencing
    /// entity points at the n-th referenced one.
    pub fn reference_with<D: FixtureDefinition>(
        &self,
        overrides: Overrides,
    ) -> Result<KeySlot, Error> {
        let target = self.harness.factory_core::<D>()?;
        let overrides = if overrides.id.is_some() {
            overrides
        } else {
            overrides.id(self.ordinal)
        };

        let source = Rc::clone(&target) as Rc<dyn EntitySource>;
        let generated =
            attribute::next_key_slot(D::Entity::KIND, source, target.sequence(), overrides)?;

        Ok(generated.slot)
    }
}

///
/// Factory
///
/// The wrapper every definition runs through. Construction attaches
/// what the definition never writes: the key attribute generator, the
/// id sequence, and the parent default. Because the factory instance
/// itself is the source bound into each proxy, a second definition
/// over the same entity type binds proxies to its own factory, never a
/// shared one.
///

#[derive(Debug)]
pub struct Factory<D: FixtureDefinition> {
    harness: Weak<HarnessCore>,
    sequence: Sequence,
    _marker: PhantomData<D>,
}

impl<D: FixtureDefinition> Factory<D> {
    pub(crate) fn new(harness: Weak<HarnessCore>) -> Self {
        Self {
            harness,
            sequence: Sequence::starting_at(D::FIRST_SEQUENCE),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Build an entity in memory. No store access, ever.
    pub fn build(self: &Rc<Self>) -> Result<D::Entity, Error> {
        self.run(Strategy::Build, Overrides::new())
    }

    /// [`Self::build`] with pinned key coordinates.
    pub fn build_with(self: &Rc<Self>, overrides: Overrides) -> Result<D::Entity, Error> {
        self.run(Strategy::Build, overrides)
    }

    /// Build, resolve deferred references, and persist. The returned
    /// entity keeps its deferred key for ergonomic re-reads; the store
    /// holds only plain keys.
    pub fn create(self: &Rc<Self>) -> Result<D::Entity, Error> {
        self.run(Strategy::Create, Overrides::new())
    }

    /// [`Self::create`] with pinned key coordinates.
    pub fn create_with(self: &Rc<Self>, overrides: Overrides) -> Result<D::Entity, Error> {
        self.run(Strategy::Create, overrides)
    }

    /// Run one generation pass under the given strategy.
    pub fn run(self: &Rc<Self>, strategy: Strategy, overrides: Overrides) -> Result<D::Entity, Error> {
        let mut entity = self.generate(overrides)?;
        self.after_generation(&mut entity, strategy == Strategy::Create)?;

        Ok(entity)
    }

    fn generate(self: &Rc<Self>, overrides: Overrides) -> Result<D::Entity, Error> {
        let core = self.core()?;
        let source = Rc::clone(self) as Rc<dyn EntitySource>;
        let generated =
            attribute::next_key_slot(D::Entity::KIND, source, &self.sequence, overrides)?;

        let ctx = BuildContext {
            slot: generated.slot,
            ordinal: generated.ordinal,
            harness: &core,
        };

        D::populate(&ctx)
    }

    /// Generate with the key pinned to an exact value; used when a
    /// proxy materializes its entity. The sequence is not claimed.
    fn generate_pinned(self: &Rc<Self>, key: &Key) -> Result<D::Entity, Error> {
        let core = self.core()?;
        let slot = KeySlot::Deferred(KeyProxy::new(
            key.clone(),
            Rc::clone(self) as Rc<dyn EntitySource>,
        ));
        let ordinal = match key.id() {
            KeyId::Int(v) => *v,
            KeyId::Text(_) => self.sequence.peek(),
        };

        let ctx = BuildContext {
            slot,
            ordinal,
            harness: &core,
        };

        D::populate(&ctx)
    }

    /// Post-generation hook: a no-op for build; for create, resolve
    /// every deferred reference and persist the entity.
    fn after_generation(&self, entity: &mut D::Entity, create: bool) -> Result<(), Error> {
        if !create {
            return Ok(());
        }

        let store = self.core()?.store_handle();
        resolver::resolve_and_persist(entity, &store)?;

        Ok(())
    }

    fn core(&self) -> Result<Rc<HarnessCore>, Error> {
        self.harness
            .upgrade()
            .ok_or_else(|| FixtureError::HarnessDropped.into())
    }
}

impl<D: FixtureDefinition> EntitySource for Factory<D> {
    fn kind(&self) -> &'static str {
        D::Entity::KIND
    }

    fn build_at(self: Rc<Self>, key: &Key) -> Result<Box<dyn Any>, Error> {
        let entity = self.generate_pinned(key)?;

        Ok(Box::new(entity))
    }

    fn create_at(self: Rc<Self>, key: &Key) -> Result<Box<dyn Any>, Error> {
        let mut entity = self.generate_pinned(key)?;
        self.after_generation(&mut entity, true)?;

        Ok(Box::new(entity))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        harness::FixtureHarness,
        test_support::{PostFixture, UserFixture},
    };
    use sapling_core::entity::Entity as _;

    #[test]
    fn build_generates_deferred_keys_with_increasing_ids() {
        let harness = FixtureHarness::new();
        let users = harness.factory::<UserFixture>().unwrap();

        let first = users.build().unwrap();
        let second = users.build().unwrap();

        assert!(first.key().is_deferred());
        assert_eq!(first.key().key().id(), &KeyId::Int(1));
        assert_eq!(second.key().key().id(), &KeyId::Int(2));
        assert_eq!(first.handle, "user-1");
    }

    #[test]
    fn build_never_touches_the_store() {
        let harness = FixtureHarness::new();
        let posts = harness.factory::<PostFixture>().unwrap();

        // Even a definition with references stays in memory on build.
        posts.build().unwrap();
        posts.build().unwrap();

        harness.store().with(|store| {
            assert_eq!(store.ops().puts, 0);
            assert_eq!(store.ops().gets, 0);
            assert!(store.is_empty());
        });
    }

    #[test]
    fn pinned_ids_do_not_claim_sequence_draws() {
        let harness = FixtureHarness::new();
        let users = harness.factory::<UserFixture>().unwrap();

        let pinned = users.build_with(Overrides::new().id(42)).unwrap();
        assert_eq!(pinned.key().key().id(), &KeyId::Int(42));

        let next = users.build().unwrap();
        assert_eq!(next.key().key().id(), &KeyId::Int(1));
    }

    #[test]
    fn run_dispatches_build_and_create() {
        let harness = FixtureHarness::new();
        let users = harness.factory::<UserFixture>().unwrap();

        users.run(Strategy::Build, Overrides::new()).unwrap();
        harness.store().with(|store| assert_eq!(store.ops().puts, 0));

        users.run(Strategy::Create, Overrides::new()).unwrap();
        harness.store().with(|store| assert_eq!(store.ops().puts, 1));
    }

    #[test]
    fn factories_outliving_their_harness_fail_cleanly() {
        let harness = FixtureHarness::new();
        let users = harness.factory::<UserFixture>().unwrap();
        drop(harness);

        let err = users.build().unwrap_err();
        assert!(err.is_unresolved());
    }
}
