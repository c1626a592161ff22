//! Account resolution pass
//!
//! Assigns the resolver's default account to every record that exposes an
//! account and has none. Policies do not override the account for their
//! body; the policy hook exists only so bodies are walked.

use crate::error::Result;
use crate::resolve::traversal::{traverse, RecordVisitor};
use tracing::{instrument, trace};
use warden_ast::{Entry, RecordGraph, RecordRef};

struct AccountResolver<'a> {
    account: &'a str,
}

impl RecordVisitor for AccountResolver<'_> {
    type Scope = ();

    fn visit(&mut self, graph: &mut RecordGraph, record: RecordRef, _: &()) -> Result<()> {
        if let Some(accountable) = graph.get_mut(record).as_accountable_mut() {
            if accountable.account().is_none() {
                accountable.set_account(Some(self.account.to_string()));
                trace!(%record, account = self.account, "account assigned");
            }
        }
        Ok(())
    }

    fn enter_policy(&mut self, _: &RecordGraph, _: RecordRef, _: &()) {}
}

/// Fills unset accounts with `account`.
#[instrument(skip_all, name = "accounts")]
pub fn resolve_accounts(graph: &mut RecordGraph, entries: &[Entry], account: &str) -> Result<()> {
    traverse(graph, entries, &mut AccountResolver { account }, &())
}
