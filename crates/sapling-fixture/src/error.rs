use sapling_core::error::{Error, ErrorClass, ErrorOrigin};
use thiserror::Error as ThisError;

///
/// FixtureError
/// Factory / registry boundary.
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum FixtureError {
    #[error("registered factory for kind '{kind}' has a different definition type")]
    DefinitionMismatch { kind: &'static str },

    #[error("definition for kind '{kind}' is already registered")]
    DuplicateDefinition { kind: &'static str },

    #[error("fixture harness was dropped while a factory was still live")]
    HarnessDropped,
}

impl FixtureError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::DefinitionMismatch { .. } => ErrorClass::Internal,
            Self::DuplicateDefinition { .. } => ErrorClass::InvariantViolation,
            Self::HarnessDropped => ErrorClass::Unresolved,
        }
    }
}

impl From<FixtureError> for Error {
    fn from(err: FixtureError) -> Self {
        Self::new(err.class(), ErrorOrigin::Factory, err.to_string())
    }
}

///
/// TESTS
///
