use sapling_core::{key::KeyId, slot::KeySlot};

///
/// Overrides
///
/// Per-call pins for the generated key's coordinates. An explicit id
/// or parent replaces the generator's computed default for that call
/// only; in particular, a pinned id does not claim a sequence value.
///

#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub(crate) id: Option<KeyId>,
    pub(crate) parent: Option<KeySlot>,
}

impl Overrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the key id for this call.
    #[must_use]
    pub fn id(mut self, id: impl Into<KeyId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Pin the parent for this call. A deferred slot is accepted; the
    /// parent entity is then materialized at create time before the
    /// child's key is considered final.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<KeySlot>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

///
/// TESTS
///
