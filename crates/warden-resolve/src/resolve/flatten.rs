//! Flatten and order pass.
//!
//! Turns the nested forest into the single sequence that gets persisted.
//!
//! # Flatten
//!
//! Depth-first walk over top-level records and policy bodies (references
//! are not followed). Every record is emitted once, in walk order. Bodies
//! are left in place on their policies; the traversal's visited set is what
//! stops a body from being emitted twice.
//!
//! # Order
//!
//! A topological sort (Kahn's algorithm) over dependencies keyed by roleid:
//! record B depends on record A when one of B's referenced records has A's
//! roleid, e.g. a group owned by `!group admins` depends on the `admins`
//! declaration. Among records whose dependencies are already placed, the
//! next one is chosen by:
//!
//! 1. **Type class** - declarations before statements
//! 2. **Position** - flattened order
//!
//! Any cycle fails with [`ResolveError::DependencyCycle`].

use crate::error::{ResolveError, Result};
use crate::resolve::traversal::{traverse, RecordVisitor};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, instrument};
use warden_ast::{Entry, RecordGraph, RecordRef};

#[derive(Default)]
struct Flattener {
    records: Vec<RecordRef>,
}

impl RecordVisitor for Flattener {
    type Scope = ();

    fn visit(&mut self, _: &mut RecordGraph, record: RecordRef, _: &()) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn enter_policy(&mut self, _: &RecordGraph, _: RecordRef, _: &()) {}

    fn follows_references(&self) -> bool {
        false
    }
}

/// Collects every top-level and body record into one sequence.
pub fn flatten(graph: &mut RecordGraph, entries: &[Entry]) -> Result<Vec<RecordRef>> {
    let mut flattener = Flattener::default();
    traverse(graph, entries, &mut flattener, &())?;
    Ok(flattener.records)
}

/// Type-class score: declarations sort first.
fn type_score(graph: &RecordGraph, record: RecordRef) -> i8 {
    if graph.get(record).is_declaration() {
        -1
    } else {
        0
    }
}

/// Dependency edges between positions of `records`.
struct DependencyGraph {
    /// position → positions it depends on
    dependencies: Vec<Vec<usize>>,
    /// position → positions depending on it
    dependents: Vec<Vec<usize>>,
}

impl DependencyGraph {
    fn build(graph: &RecordGraph, records: &[RecordRef]) -> Self {
        let mut providers: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (position, &record) in records.iter().enumerate() {
            if let Some(roleid) = graph.roleid(record) {
                providers.entry(roleid).or_default().push(position);
            }
        }

        let mut dependencies = vec![Vec::new(); records.len()];
        let mut dependents = vec![Vec::new(); records.len()];
        for (position, &record) in records.iter().enumerate() {
            let mut seen = HashSet::new();
            for referenced in graph.referenced_records(record) {
                let Some(roleid) = graph.roleid(referenced) else {
                    continue;
                };
                let Some(positions) = providers.get(&roleid) else {
                    continue;
                };
                for &provider in positions {
                    if provider != position && seen.insert(provider) {
                        dependencies[position].push(provider);
                        dependents[provider].push(position);
                    }
                }
            }
        }

        Self {
            dependencies,
            dependents,
        }
    }
}

/// Sorts flattened records so every record follows the roles it references.
#[instrument(skip_all, name = "order", fields(records = records.len()))]
pub fn order(graph: &RecordGraph, records: &[RecordRef]) -> Result<Vec<RecordRef>> {
    let deps = DependencyGraph::build(graph, records);
    let mut in_degree: Vec<usize> = deps.dependencies.iter().map(Vec::len).collect();

    let mut ready: BTreeSet<(i8, usize)> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(position, _)| (type_score(graph, records[position]), position))
        .collect();

    let mut ordered = Vec::with_capacity(records.len());
    let mut placed = vec![false; records.len()];
    while let Some((_, position)) = ready.pop_first() {
        ordered.push(records[position]);
        placed[position] = true;
        for &dependent in &deps.dependents[position] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert((type_score(graph, records[dependent]), dependent));
            }
        }
    }

    if ordered.len() < records.len() {
        let (first, second) = find_cycle(&deps, &placed);
        return Err(ResolveError::DependencyCycle {
            first: graph.describe(records[first]),
            second: graph.describe(records[second]),
        });
    }

    Ok(ordered)
}

/// Returns two adjacent positions on a cycle among unplaced records.
///
/// Every unplaced record still has an unplaced dependency, so following
/// dependencies from any of them must eventually revisit a position.
fn find_cycle(deps: &DependencyGraph, placed: &[bool]) -> (usize, usize) {
    let next = |position: usize| {
        deps.dependencies[position]
            .iter()
            .copied()
            .find(|&dependency| !placed[dependency])
    };

    let mut current = placed.iter().position(|&done| !done).unwrap_or_default();
    let mut visited = HashSet::new();
    while visited.insert(current) {
        match next(current) {
            Some(dependency) => current = dependency,
            None => break,
        }
    }
    (current, next(current).unwrap_or(current))
}

/// Flattens the forest and orders it by dependency.
#[instrument(skip_all, name = "flatten")]
pub fn flatten_and_order(graph: &mut RecordGraph, entries: &[Entry]) -> Result<Vec<RecordRef>> {
    let records = flatten(graph, entries)?;
    debug!(records = records.len(), "forest flattened");
    order(graph, &records)
}
