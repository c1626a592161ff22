//! Arena-backed record graph.
//!
//! Records reference each other freely (owners, grant members, permit
//! resources), and the same entity may be reachable along several paths
//! before ids are qualified. The graph therefore owns every record in a
//! flat arena and hands out [`RecordRef`] handles. A handle is the stable
//! identity used by traversals for visited-set deduplication; two records
//! with identical contents are still distinct nodes.

use crate::record::Record;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Stable handle to a record inside a [`RecordGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordRef(usize);

impl RecordRef {
    /// Builds a handle from a raw arena index.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An element of an array-ish record forest.
///
/// Documents may nest lists arbitrarily deep; traversal flattens them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Record(RecordRef),
    List(Vec<Entry>),
}

impl From<RecordRef> for Entry {
    fn from(record: RecordRef) -> Self {
        Entry::Record(record)
    }
}

impl From<Vec<Entry>> for Entry {
    fn from(entries: Vec<Entry>) -> Self {
        Entry::List(entries)
    }
}

/// Flattens nested entries into record handles, preserving order.
pub fn flatten_entries(entries: &[Entry]) -> Vec<RecordRef> {
    let mut out = Vec::new();
    flatten_into(entries, &mut out);
    out
}

fn flatten_into(entries: &[Entry], out: &mut Vec<RecordRef>) {
    for entry in entries {
        match entry {
            Entry::Record(record) => out.push(*record),
            Entry::List(nested) => flatten_into(nested, out),
        }
    }
}

/// Owner of every record reachable from a policy document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordGraph {
    records: Vec<Record>,
}

impl RecordGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record and returns its handle.
    pub fn insert(&mut self, record: impl Into<Record>) -> RecordRef {
        self.records.push(record.into());
        RecordRef(self.records.len() - 1)
    }

    /// Returns the record behind `record`.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not produced by this graph.
    pub fn get(&self, record: RecordRef) -> &Record {
        &self.records[record.0]
    }

    /// Mutable variant of [`RecordGraph::get`].
    pub fn get_mut(&mut self, record: RecordRef) -> &mut Record {
        &mut self.records[record.0]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates every record in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordRef, &Record)> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| (RecordRef(index), record))
    }

    /// Records reachable from `record` through its fields.
    pub fn referenced_records(&self, record: RecordRef) -> Vec<RecordRef> {
        self.get(record).referenced_records()
    }

    /// Flattened body of a policy; empty for every other variant.
    pub fn body(&self, record: RecordRef) -> Vec<RecordRef> {
        self.get(record)
            .as_policy()
            .map(|policy| flatten_entries(&policy.body))
            .unwrap_or_default()
    }

    pub fn is_policy(&self, record: RecordRef) -> bool {
        self.get(record).as_policy().is_some()
    }

    pub fn kind(&self, record: RecordRef) -> &str {
        self.get(record).kind()
    }

    pub fn id(&self, record: RecordRef) -> Option<&str> {
        self.get(record).as_identifiable().map(|identifiable| identifiable.id())
    }

    pub fn account(&self, record: RecordRef) -> Option<&str> {
        self.get(record)
            .as_accountable()
            .and_then(|accountable| accountable.account())
    }

    /// `account:kind:id` for any record with an account and an id.
    pub fn qualified_id(&self, record: RecordRef) -> Option<String> {
        let id = self.id(record)?;
        let account = self.account(record)?;
        Some(format!("{account}:{}:{id}", self.kind(record)))
    }

    /// `account:kind:id` of a role record; `None` for non-roles or while
    /// the account is still unset.
    pub fn roleid(&self, record: RecordRef) -> Option<String> {
        if self.get(record).is_role() {
            self.qualified_id(record)
        } else {
            None
        }
    }

    /// Short human description, `<kind> '<id>'`, used in diagnostics.
    pub fn describe(&self, record: RecordRef) -> String {
        match self.id(record) {
            Some(id) => format!("{} '{}'", self.kind(record), id),
            None => format!("{} {}", self.kind(record), record),
        }
    }
}

impl Index<RecordRef> for RecordGraph {
    type Output = Record;

    fn index(&self, record: RecordRef) -> &Record {
        self.get(record)
    }
}

impl IndexMut<RecordRef> for RecordGraph {
    fn index_mut(&mut self, record: RecordRef) -> &mut Record {
        self.get_mut(record)
    }
}
