//! Depth-first walker shared by every resolution pass.
//!
//! # Design
//!
//! - **Identity dedup** - A [`Traversal`] owns the visited set, keyed by
//!   [`RecordRef`] rather than by id, since ids are still being rewritten
//!   while passes run. A record is handled at most once per traversal.
//! - **Visitor hooks** - A pass implements [`RecordVisitor`]: `visit` handles
//!   one record, `enter_policy` derives the scope for a policy's body.
//! - **Scope threading** - Per-pass scope (current namespace, default owner)
//!   is passed down the recursion by value, so leaving a policy restores the
//!   outer scope on every exit path, errors included.
//!
//! # Traversal Order
//!
//! For each unvisited record:
//! 1. `visit` the record
//! 2. walk its referenced records with the same scope (if the pass follows them)
//! 3. if it is a policy, walk its body with the scope from `enter_policy`

use crate::error::Result;
use std::collections::HashSet;
use tracing::trace;
use warden_ast::{flatten_entries, Entry, RecordGraph, RecordRef};

/// Pass-specific behaviour plugged into a [`Traversal`].
pub trait RecordVisitor {
    /// State inherited from enclosing policies.
    type Scope;

    /// Handles one record. Called once per record per traversal.
    fn visit(
        &mut self,
        graph: &mut RecordGraph,
        record: RecordRef,
        scope: &Self::Scope,
    ) -> Result<()>;

    /// Scope in effect for the body of `policy`.
    fn enter_policy(
        &mut self,
        graph: &RecordGraph,
        policy: RecordRef,
        scope: &Self::Scope,
    ) -> Self::Scope;

    /// Whether referenced records are walked after the record itself.
    fn follows_references(&self) -> bool {
        true
    }
}

/// Visited set for one walk over a record forest.
#[derive(Debug, Default)]
pub struct Traversal {
    visited: HashSet<RecordRef>,
}

impl Traversal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visited(&self, record: RecordRef) -> bool {
        self.visited.contains(&record)
    }

    /// Number of distinct records handled so far.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Walks `records` depth-first, skipping anything already visited.
    pub fn walk<V: RecordVisitor>(
        &mut self,
        graph: &mut RecordGraph,
        records: &[RecordRef],
        visitor: &mut V,
        scope: &V::Scope,
    ) -> Result<()> {
        for &record in records {
            if !self.visited.insert(record) {
                trace!(%record, "already visited");
                continue;
            }

            visitor.visit(graph, record, scope)?;

            if visitor.follows_references() {
                let referenced = graph.referenced_records(record);
                self.walk(graph, &referenced, visitor, scope)?;
            }

            if graph.is_policy(record) {
                let inner = visitor.enter_policy(graph, record, scope);
                let body = graph.body(record);
                self.walk(graph, &body, visitor, &inner)?;
            }
        }
        Ok(())
    }
}

/// Walks a (possibly nested) forest with a fresh visited set.
pub fn traverse<V: RecordVisitor>(
    graph: &mut RecordGraph,
    entries: &[Entry],
    visitor: &mut V,
    scope: &V::Scope,
) -> Result<()> {
    let records = flatten_entries(entries);
    Traversal::new().walk(graph, &records, visitor, scope)
}
