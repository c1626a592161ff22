//! Owner resolution pass
//!
//! Gives every ownable record without an explicit owner a default one:
//! the role of the innermost enclosing policy, or the resolver's global
//! owner at the root. Defaults are new role references added to the graph;
//! explicit owners from the document are left untouched.

use crate::error::Result;
use crate::resolve::traversal::{traverse, RecordVisitor};
use tracing::{instrument, trace};
use warden_ast::{Entry, Policy, RecordGraph, RecordRef, Role};

struct OwnerResolver<'a> {
    /// Account used for a policy role when the policy has none.
    account: &'a str,
    assigned: usize,
}

fn roleid(role: &Role) -> String {
    format!(
        "{}:{}:{}",
        role.account.as_deref().unwrap_or_default(),
        role.kind,
        role.id
    )
}

impl RecordVisitor for OwnerResolver<'_> {
    type Scope = Role;

    fn visit(&mut self, graph: &mut RecordGraph, record: RecordRef, owner: &Role) -> Result<()> {
        let unowned = graph
            .get(record)
            .as_ownable()
            .is_some_and(|ownable| ownable.owner().is_none());
        if !unowned {
            return Ok(());
        }

        let default_owner = graph.insert(owner.clone());
        if let Some(ownable) = graph.get_mut(record).as_ownable_mut() {
            ownable.set_owner(Some(default_owner));
            self.assigned += 1;
            trace!(%record, owner = %roleid(owner), "default owner assigned");
        }
        Ok(())
    }

    fn enter_policy(&mut self, graph: &RecordGraph, policy: RecordRef, _: &Role) -> Role {
        Role {
            kind: Policy::KIND.to_string(),
            id: graph.id(policy).unwrap_or_default().to_string(),
            account: Some(graph.account(policy).unwrap_or(self.account).to_string()),
        }
    }
}

/// Assigns default owners below `owner`, switching to each policy's role
/// inside its body.
#[instrument(skip_all, name = "owners", fields(owner = %roleid(owner)))]
pub fn resolve_owners(
    graph: &mut RecordGraph,
    entries: &[Entry],
    account: &str,
    owner: &Role,
) -> Result<()> {
    let mut resolver = OwnerResolver {
        account,
        assigned: 0,
    };
    traverse(graph, entries, &mut resolver, owner)?;
    trace!(assigned = resolver.assigned, "owners resolved");
    Ok(())
}
