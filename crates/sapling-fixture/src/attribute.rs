use crate::{overrides::Overrides, sequence::Sequence};
use sapling_core::{
    error::Error,
    key::{Key, KeyId},
    slot::{EntitySource, KeyProxy, KeySlot},
};
use std::rc::Rc;

///
/// Key attribute generation: computes `(id, parent)` for one new
/// instance, then binds the finished key to its source as a deferred
/// slot. Both coordinates are final before the proxy is constructed;
/// no proxy is ever observable with partial coordinates.
///

/// The generated slot plus the ordinal that parameterizes the
/// instance (the sequence draw, or the pinned id's stand-in).
#[derive(Debug)]
pub(crate) struct GeneratedKey {
    pub(crate) slot: KeySlot,
    pub(crate) ordinal: i64,
}

pub(crate) fn next_key_slot(
    kind: &'static str,
    source: Rc<dyn EntitySource>,
    sequence: &Sequence,
    overrides: Overrides,
) -> Result<GeneratedKey, Error> {
    // 1. id: explicit pin wins; otherwise claim the next sequence
    //    value. Pinned calls leave the counter untouched.
    let (id, ordinal) = match overrides.id {
        Some(KeyId::Int(v)) => (KeyId::Int(v), v),
        Some(id @ KeyId::Text(_)) => (id, sequence.peek()),
        None => {
            let v = sequence.next_value();
            (KeyId::Int(v), v)
        }
    };

    // 2. parent: explicit pin (possibly itself deferred); default root.
    let parent = overrides.parent;

    // 3. Assemble the key, then wrap it.
    let key = match &parent {
        Some(slot) => Key::try_with_parent(kind, id, slot.key().clone())?,
        None => Key::try_new(kind, id)?,
    };

    let slot = match parent {
        Some(p) if p.is_deferred() => {
            KeySlot::Deferred(KeyProxy::with_deferred_parent(key, source, p))
        }
        _ => KeySlot::Deferred(KeyProxy::new(key, source)),
    };

    Ok(GeneratedKey { slot, ordinal })
}

///
/// TESTS
///
