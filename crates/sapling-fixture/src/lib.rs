//! Factory-side runtime for Sapling: per-factory sequences, per-call
//! overrides, the deferred key attribute generator, the factory
//! wrapper every definition runs through, the harness registry, and
//! create-time resolution of deferred references.
#![warn(unreachable_pub)]

pub mod error;
pub mod factory;
pub mod harness;
pub mod overrides;
pub mod sequence;

pub(crate) mod attribute;
pub(crate) mod resolver;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        factory::{BuildContext, Factory, FixtureDefinition, Strategy},
        harness::FixtureHarness,
        overrides::Overrides,
        sequence::Sequence,
    };
}
