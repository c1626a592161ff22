//! Compact output pass.
//!
//! Not part of resolution. Strips accounts equal to a reference account and
//! owners whose roleid equals a reference ownerid, so expected-output
//! fixtures only spell out what differs from the defaults.

use crate::error::Result;
use crate::resolve::traversal::{traverse, RecordVisitor};
use tracing::instrument;
use warden_ast::{Entry, RecordGraph, RecordRef};

/// What to strip from one record.
struct Strip {
    record: RecordRef,
    account: bool,
    owner: bool,
}

struct Compactor<'a> {
    account: &'a str,
    ownerid: &'a str,
    strips: Vec<Strip>,
}

impl RecordVisitor for Compactor<'_> {
    type Scope = ();

    fn visit(&mut self, graph: &mut RecordGraph, record: RecordRef, _: &()) -> Result<()> {
        let account = graph.account(record) == Some(self.account);
        let owner = graph
            .get(record)
            .as_ownable()
            .and_then(|ownable| ownable.owner())
            .and_then(|owner| graph.roleid(owner))
            .is_some_and(|roleid| roleid == self.ownerid);
        if account || owner {
            self.strips.push(Strip {
                record,
                account,
                owner,
            });
        }
        Ok(())
    }

    fn enter_policy(&mut self, _: &RecordGraph, _: RecordRef, _: &()) {}
}

/// Removes default-valued accounts and owners from every reachable record.
///
/// Decisions are taken on the untouched graph and applied afterwards, so an
/// owner reference losing its account does not change whether its owned
/// record matches.
#[instrument(skip_all, name = "compact")]
pub fn compact(
    graph: &mut RecordGraph,
    entries: &[Entry],
    account: &str,
    ownerid: &str,
) -> Result<()> {
    let mut compactor = Compactor {
        account,
        ownerid,
        strips: Vec::new(),
    };
    traverse(graph, entries, &mut compactor, &())?;

    for strip in compactor.strips {
        let record = graph.get_mut(strip.record);
        if strip.owner {
            if let Some(ownable) = record.as_ownable_mut() {
                ownable.set_owner(None);
            }
        }
        if strip.account {
            if let Some(accountable) = record.as_accountable_mut() {
                accountable.set_account(None);
            }
        }
    }
    Ok(())
}
