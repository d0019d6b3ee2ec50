//! Store-side runtime for Sapling: kind names, ancestor-path keys, key
//! slots and the deferred-key seam, the entity contract, and the row
//! store fixtures persist into.
#![warn(unreachable_pub)]

#[macro_use]
pub mod macros;

// public exports are one module level down
pub mod entity;
pub mod error;
pub mod key;
pub mod kind;
pub mod serialize;
pub mod slot;
pub mod store;

///
/// CONSTANTS
///

/// Maximum number of segments in one ancestor path.
///
/// This limit keeps encoded keys within bounded, storable sizes and
/// simplifies sizing tests in the store.
pub const MAX_KEY_DEPTH: usize = 16;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, serializers, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        entity::Entity,
        key::{Key, KeyId},
        kind::KindName,
        slot::{EntitySource, KeyProxy, KeySlot},
    };
}
