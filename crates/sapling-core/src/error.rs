use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured runtime error with a stable internal classification.
/// Every boundary enum in the workspace converts into this type, so
/// callers of `build`/`create` see one error surface.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a key-origin invalid-key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidKey, ErrorOrigin::Key, message)
    }

    /// Construct a store-origin corruption error.
    pub fn store_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Store, message)
    }

    /// Construct a store-origin invariant violation.
    pub fn store_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Store, message)
    }

    /// Construct a factory-origin unresolved-dependency error.
    pub fn unresolved(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unresolved, ErrorOrigin::Factory, message)
    }

    /// Construct a resolver-origin internal error.
    pub fn resolver_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Resolver, message)
    }

    #[must_use]
    pub const fn is_invalid_key(&self) -> bool {
        matches!(self.class, ErrorClass::InvalidKey)
    }

    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self.class, ErrorClass::Unresolved)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    Internal,
    InvalidKey,
    InvariantViolation,
    Unresolved,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::Internal => "internal",
            Self::InvalidKey => "invalid_key",
            Self::InvariantViolation => "invariant_violation",
            Self::Unresolved => "unresolved",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Factory,
    Key,
    Resolver,
    Serialize,
    Store,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Factory => "factory",
            Self::Key => "key",
            Self::Resolver => "resolver",
            Self::Serialize => "serialize",
            Self::Store => "store",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = Error::invalid_key("id 0 is not storable");
        assert_eq!(
            err.display_with_class(),
            "key:invalid_key: id 0 is not storable"
        );
    }

    #[test]
    fn class_predicates_match_constructors() {
        assert!(Error::invalid_key("x").is_invalid_key());
        assert!(Error::unresolved("x").is_unresolved());
        assert!(!Error::store_corruption("x").is_invalid_key());
    }
}
