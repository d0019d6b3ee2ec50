//! ## Crate layout
//! - `core`: kinds, ancestor-path keys, key slots, entities, and the row store.
//! - `fixture`: sequences, overrides, factories, the harness, and
//!   create-time resolution of deferred references.
//!
//! The `prelude` module mirrors the surface fixture code uses day to day.

pub use sapling_core as core;
pub use sapling_fixture as fixture;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Macros
//

pub use sapling_core::{entity_kind, error::Error};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        entity::Entity as _,
        key::{Key, KeyId},
        kind::KindName,
        slot::{KeyProxy, KeySlot},
        store::{DataStore, StoreHandle},
    };
    pub use crate::fixture::{
        factory::{BuildContext, Factory, FixtureDefinition, Strategy},
        harness::FixtureHarness,
        overrides::Overrides,
        sequence::Sequence,
    };
    pub use serde::{Deserialize, Serialize};
}
