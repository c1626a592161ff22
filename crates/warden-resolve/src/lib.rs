// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Resolution passes for policy record graphs
//!
//! Turns the record forest produced from a policy document into a flat,
//! fully-qualified, dependency-ordered list of records ready to persist.

pub mod error;
pub mod resolve;

pub use error::{ResolveError, Result};
pub use resolve::*;
