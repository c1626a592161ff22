//! Resolution pipeline and its passes.
//!
//! ```text
//! accounts → namespaces → relative paths → owners → flatten/order → duplicates
//! ```
//!
//! Each pass consumes the graph left by the previous one. All passes except
//! duplicate detection walk the record forest through [`traversal`].

pub mod accounts;
pub mod compact;
pub mod duplicates;
pub mod flatten;
pub mod namespaces;
pub mod owners;
pub mod pipeline;
pub mod relative;
pub mod traversal;

pub use accounts::resolve_accounts;
pub use compact::compact;
pub use duplicates::check_duplicates;
pub use flatten::{flatten, flatten_and_order, order};
pub use namespaces::resolve_namespaces;
pub use owners::resolve_owners;
pub use pipeline::{resolve, Resolver};
pub use relative::{absolute_path_of, resolve_relative_paths};
pub use traversal::{traverse, RecordVisitor, Traversal};
