//! Duplicate record detection.
//!
//! A flat scan of the resolved sequence. Two records clash when they share
//! both kind and fully-qualified id; records without an id never clash.

use crate::error::{ResolveError, Result};
use std::collections::HashSet;
use tracing::instrument;
use warden_ast::{RecordGraph, RecordRef};

/// Fails on the first record whose `(kind, id)` was already seen.
#[instrument(skip_all, name = "duplicates")]
pub fn check_duplicates(graph: &RecordGraph, records: &[RecordRef]) -> Result<()> {
    let mut seen = HashSet::new();
    for &record in records {
        let Some(id) = graph.id(record) else {
            continue;
        };
        if !seen.insert((graph.kind(record), id)) {
            return Err(ResolveError::DuplicateRecord {
                record: graph.describe(record),
            });
        }
    }
    Ok(())
}
