//! Resolution errors
//!
//! Every pass fails fast: the first invalid condition aborts the whole
//! resolution and no partially resolved list is returned.

use thiserror::Error;

/// Resolver result type
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Missing account or owner, or an owner that is not `account:kind:id`.
    #[error("invalid resolver configuration: {0}")]
    InvalidConfiguration(String),

    /// A blank id outside of any policy.
    #[error("{kind} has a blank id and no enclosing policy to inherit one from")]
    MissingIdentifier { kind: String },

    #[error("invalid relative reference '{path}': {reason}")]
    InvalidRelativeReference { path: String, reason: &'static str },

    #[error("dependency cycle between {first} and {second}")]
    DependencyCycle { first: String, second: String },

    #[error("duplicate record {record}")]
    DuplicateRecord { record: String },
}
