//! Resolver driver.
//!
//! Runs the passes strictly in order over one raw record forest:
//!
//! 1. Accounts - unset accounts get the default account
//! 2. Namespaces - ids qualified by enclosing policies
//! 3. Relative paths - `..` references collapsed
//! 4. Owners - unowned records get the policy role or the default owner
//! 5. Flatten/order - one dependency-ordered sequence
//! 6. Duplicates - `(kind, id)` clashes rejected
//!
//! The first failing pass aborts resolution. Resolution mutates the graph
//! and is meant to run exactly once per freshly loaded graph; running it
//! again re-applies namespace prefixes.

use crate::error::{ResolveError, Result};
use crate::resolve::accounts::resolve_accounts;
use crate::resolve::duplicates::check_duplicates;
use crate::resolve::flatten::flatten_and_order;
use crate::resolve::namespaces::resolve_namespaces;
use crate::resolve::owners::resolve_owners;
use crate::resolve::relative::resolve_relative_paths;
use tracing::{info, instrument};
use warden_ast::{Entry, RecordGraph, RecordRef, Role};

/// Validated resolver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolver {
    account: String,
    owner: Role,
}

impl Resolver {
    /// Creates a resolver for `account` whose root records are owned by
    /// `ownerid` (`account:kind:id`).
    ///
    /// # Errors
    ///
    /// [`ResolveError::InvalidConfiguration`] if either value is blank or
    /// `ownerid` does not have exactly three non-empty segments.
    pub fn new(account: impl Into<String>, ownerid: impl Into<String>) -> Result<Self> {
        let account = account.into();
        let ownerid = ownerid.into();

        if account.trim().is_empty() {
            return Err(ResolveError::InvalidConfiguration(
                "account is required".to_string(),
            ));
        }
        if ownerid.trim().is_empty() {
            return Err(ResolveError::InvalidConfiguration(
                "ownerid is required".to_string(),
            ));
        }
        let owner = Role::parse_roleid(&ownerid).ok_or_else(|| {
            ResolveError::InvalidConfiguration(format!(
                "ownerid '{ownerid}' must have the form account:kind:id"
            ))
        })?;

        Ok(Self { account, owner })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Default owner as `account:kind:id`.
    pub fn ownerid(&self) -> String {
        format!(
            "{}:{}:{}",
            self.owner.account.as_deref().unwrap_or_default(),
            self.owner.kind,
            self.owner.id
        )
    }

    /// Resolves `entries` in place and returns the ordered flat record list.
    #[instrument(skip_all, name = "resolve", fields(account = %self.account))]
    pub fn resolve(&self, graph: &mut RecordGraph, entries: &[Entry]) -> Result<Vec<RecordRef>> {
        resolve_accounts(graph, entries, &self.account)?;
        resolve_namespaces(graph, entries)?;
        resolve_relative_paths(graph, entries)?;
        resolve_owners(graph, entries, &self.account, &self.owner)?;
        let records = flatten_and_order(graph, entries)?;
        check_duplicates(graph, &records)?;

        info!(records = records.len(), "policy resolved");
        Ok(records)
    }
}

/// One-shot form of [`Resolver::new`] followed by [`Resolver::resolve`].
pub fn resolve(
    graph: &mut RecordGraph,
    entries: &[Entry],
    account: &str,
    ownerid: &str,
) -> Result<Vec<RecordRef>> {
    Resolver::new(account, ownerid)?.resolve(graph, entries)
}
