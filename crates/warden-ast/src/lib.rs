// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Record graph for declarative access-control policies.
//!
//! This crate defines the records a policy document is made of (roles,
//! resources, grants, permits, nested policies), the arena that owns them,
//! and JSON loading/export. Resolution passes live in `warden-resolve`.

pub mod document;
pub mod error;
pub mod graph;
pub mod record;

pub use document::{export_records, Document};
pub use error::DocumentError;
pub use graph::{flatten_entries, Entry, RecordGraph, RecordRef};
pub use record::{
    Accountable, Annotatable, Annotations, Delete, Deny, Grant, Group, Host, HostFactory,
    Identifiable, Layer, Member, Ownable, Permit, Policy, Record, Resource, Revoke, Role, User,
    Variable, Webservice,
};
