use sapling_core::{
    entity::Entity,
    error::Error,
    key::Key,
    slot::{KeyProxy, KeySlot},
    store::StoreHandle,
};

///
/// Create-time resolution: materialize every deferred reference an
/// entity carries, rewrite those fields to plain keys, persist the
/// entity, and hand its own deferred key back for ergonomic re-reads.
///
/// No rollback. A failed dependency leaves everything created so far
/// in the store and propagates the underlying error unchanged.
/// Mutually referencing definitions recurse until the stack gives out;
/// that risk is accepted, not guarded.
///

pub(crate) fn resolve_and_persist<E: Entity>(
    entity: &mut E,
    store: &StoreHandle,
) -> Result<Key, Error> {
    // 1. Dependencies first, depth-first: each deferred reference is
    //    materialized (if absent) and the field rewritten to its plain
    //    key. Only plain keys reach the row encoder.
    for slot in entity.reference_slots() {
        resolve_slot(slot, store)?;
    }

    // 2. The entity's own parent must be real before its key is final.
    let original = entity.key().clone();
    if let Some(proxy) = original.proxy() {
        if let Some(parent) = proxy.deferred_parent() {
            ensure_slot_exists(parent, store)?;
        }
    }

    // 3. Swap in the plain key, persist, then restore the deferred
    //    form on the in-memory entity.
    *entity.key_mut() = KeySlot::Resolved(original.key().clone());
    let stored = store.with_mut(|s| s.put(entity))?;
    *entity.key_mut() = original;

    Ok(stored)
}

/// Rewrite one reference slot to its plain key, materializing the
/// addressed entity first when it is still deferred.
fn resolve_slot(slot: &mut KeySlot, store: &StoreHandle) -> Result<(), Error> {
    let Some(proxy) = slot.proxy() else {
        return Ok(());
    };

    let proxy = proxy.clone();
    ensure_exists(&proxy, store)?;
    *slot = KeySlot::Resolved(proxy.key().clone());

    Ok(())
}

fn ensure_slot_exists(slot: &KeySlot, store: &StoreHandle) -> Result<(), Error> {
    match slot.proxy() {
        Some(proxy) => ensure_exists(proxy, store),
        None => Ok(()),
    }
}

/// Get-or-create for one deferred key: the addressed entity is created
/// through its bound source only when the store has nothing at that
/// key. Parent chains resolve before the key they anchor.
fn ensure_exists(proxy: &KeyProxy, store: &StoreHandle) -> Result<(), Error> {
    if let Some(parent) = proxy.deferred_parent() {
        ensure_slot_exists(parent, store)?;
    }

    let present = store.with_mut(|s| s.contains(proxy.key()));
    if !present {
        // Creating the dependency runs its own resolution pass, so
        // transitive references materialize depth-first here.
        proxy.materialize(true)?;
    }

    Ok(())
}

///
/// TESTS
///
