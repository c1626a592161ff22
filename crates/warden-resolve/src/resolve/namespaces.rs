//! Namespace resolution pass
//!
//! Qualifies record ids with the chain of enclosing policies, treating
//! nested policies like directories.
//!
//! # Rules
//!
//! With `ns` the id of the innermost enclosing policy (already qualified):
//!
//! | id        | kind     | result                          |
//! |-----------|----------|---------------------------------|
//! | blank     | any      | `ns` (error at the root)        |
//! | `alice`   | `user`   | `alice@ns` with `/` in `ns` → `-` |
//! | `devs`    | other    | `ns/devs`                       |
//!
//! At the root the id is left as written.
//!
//! # Examples
//!
//! ```text
//! policy myapp
//!   policy db
//!     group admins   → myapp/db/admins
//!     user alice     → alice@myapp-db
//!     policy ""      → myapp/db
//! ```

use crate::error::{ResolveError, Result};
use crate::resolve::traversal::{traverse, RecordVisitor};
use tracing::{instrument, trace};
use warden_ast::{Entry, RecordGraph, RecordRef, User};

struct NamespaceResolver;

/// Computes the qualified id for `id` of a record of `kind`.
fn qualify(id: &str, kind: &str, namespace: Option<&str>) -> Option<String> {
    if id.trim().is_empty() {
        return namespace.map(str::to_string);
    }
    let qualified = match namespace {
        None => id.to_string(),
        Some(ns) if kind == User::KIND => format!("{id}@{}", ns.replace('/', "-")),
        Some(ns) => format!("{ns}/{id}"),
    };
    Some(qualified)
}

impl RecordVisitor for NamespaceResolver {
    type Scope = Option<String>;

    fn visit(
        &mut self,
        graph: &mut RecordGraph,
        record: RecordRef,
        namespace: &Option<String>,
    ) -> Result<()> {
        let Some(id) = graph.id(record) else {
            return Ok(());
        };
        let kind = graph.kind(record);
        let qualified = qualify(id, kind, namespace.as_deref()).ok_or_else(|| {
            ResolveError::MissingIdentifier {
                kind: kind.to_string(),
            }
        })?;

        trace!(%record, from = id, to = %qualified, "id qualified");
        if let Some(identifiable) = graph.get_mut(record).as_identifiable_mut() {
            identifiable.set_id(qualified);
        }
        Ok(())
    }

    fn enter_policy(
        &mut self,
        graph: &RecordGraph,
        policy: RecordRef,
        _: &Option<String>,
    ) -> Option<String> {
        graph.id(policy).map(str::to_string)
    }
}

/// Rewrites every id relative to its enclosing policies.
#[instrument(skip_all, name = "namespaces")]
pub fn resolve_namespaces(graph: &mut RecordGraph, entries: &[Entry]) -> Result<()> {
    traverse(graph, entries, &mut NamespaceResolver, &None)
}
