//! Relative path resolution pass
//!
//! Collapses `..` segments left in qualified ids by references that climb
//! out of their policy, e.g. a grant inside `app/db` naming `../admins`
//! becomes `app/db/../admins` after namespacing and `app/admins` here.
//!
//! Only these places are rewritten:
//!
//! - grant member roles
//! - permit roles
//! - annotation values containing a `..` segment, taken relative to the
//!   annotated record's id

use crate::error::{ResolveError, Result};
use crate::resolve::traversal::{traverse, RecordVisitor};
use tracing::{instrument, trace};
use warden_ast::{Entry, Record, RecordGraph, RecordRef};

/// Collapses every `..` segment together with the segment before it.
///
/// ```
/// # use warden_resolve::absolute_path_of;
/// assert_eq!(absolute_path_of("app/db/../admins").unwrap(), "app/admins");
/// assert!(absolute_path_of("../admins").is_err());
/// assert!(absolute_path_of("a/../..").is_err());
/// ```
pub fn absolute_path_of(path: &str) -> Result<String> {
    let mut tokens: Vec<&str> = path.split('/').collect();
    while let Some(index) = tokens.iter().position(|token| *token == "..") {
        if index == 0 {
            return Err(ResolveError::InvalidRelativeReference {
                path: path.to_string(),
                reason: "no parent segment to climb out of",
            });
        }
        tokens.drain(index - 1..=index);
    }
    if tokens.is_empty() {
        return Err(ResolveError::InvalidRelativeReference {
            path: path.to_string(),
            reason: "reference collapses to nothing",
        });
    }
    Ok(tokens.join("/"))
}

fn is_relative(value: &str) -> bool {
    value.split('/').any(|segment| segment == "..")
}

/// Rewrites the id of `record` to its absolute form.
fn resolve_id(graph: &mut RecordGraph, record: RecordRef) -> Result<()> {
    let Some(id) = graph.id(record) else {
        return Ok(());
    };
    let absolute = absolute_path_of(id)?;
    if absolute != id {
        trace!(%record, from = id, to = %absolute, "relative id collapsed");
    }
    if let Some(identifiable) = graph.get_mut(record).as_identifiable_mut() {
        identifiable.set_id(absolute);
    }
    Ok(())
}

struct RelativePathResolver;

impl RecordVisitor for RelativePathResolver {
    type Scope = ();

    fn visit(&mut self, graph: &mut RecordGraph, record: RecordRef, _: &()) -> Result<()> {
        let roles: Vec<RecordRef> = match graph.get(record) {
            Record::Grant(grant) => grant.members.iter().map(|member| member.role).collect(),
            Record::Permit(permit) => permit.roles.clone(),
            _ => Vec::new(),
        };
        for role in roles {
            resolve_id(graph, role)?;
        }

        let Some(annotatable) = graph.get(record).as_annotatable() else {
            return Ok(());
        };
        let base = graph.id(record).unwrap_or_default();
        let mut rewritten = Vec::new();
        for (key, value) in annotatable.annotations() {
            if is_relative(value) {
                let absolute = absolute_path_of(&format!("{base}/{value}"))?;
                rewritten.push((key.clone(), absolute));
            }
        }
        if let Some(annotatable) = graph.get_mut(record).as_annotatable_mut() {
            for (key, absolute) in rewritten {
                trace!(%record, annotation = %key, to = %absolute, "annotation collapsed");
                annotatable.annotations_mut().insert(key, absolute);
            }
        }
        Ok(())
    }

    fn enter_policy(&mut self, _: &RecordGraph, _: RecordRef, _: &()) {}
}

/// Rewrites relative references in grants, permits and annotations.
#[instrument(skip_all, name = "relative_paths")]
pub fn resolve_relative_paths(graph: &mut RecordGraph, entries: &[Entry]) -> Result<()> {
    traverse(graph, entries, &mut RelativePathResolver, &())
}
