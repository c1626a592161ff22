// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Warden Tools
//!
//! CLI tools for resolving policy documents.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use warden_ast::{export_records, Document, DocumentError};
use warden_resolve::{compact, ResolveError, Resolver};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Default is `info`, with `debug` for warden crates. Logs go to stderr.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,warden_tools=debug,warden_resolve=debug,warden_ast=debug")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Options for [`resolve_file`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub account: String,
    pub ownerid: String,
    /// Strip accounts and owners that match the defaults from the output.
    pub compact: bool,
}

/// Loads a policy document, resolves it and renders the flat record list.
pub fn resolve_file(path: &Path, options: &ResolveOptions) -> Result<Value, ToolError> {
    let resolver = Resolver::new(options.account.as_str(), options.ownerid.as_str())?;

    let (mut graph, entries) = Document::load(path)?.lower();
    debug!(nodes = graph.len(), "document loaded");

    let records = resolver.resolve(&mut graph, &entries)?;
    if options.compact {
        compact(&mut graph, &entries, resolver.account(), &resolver.ownerid())?;
    }

    info!("Resolved {} records from {}", records.len(), path.display());
    Ok(export_records(&graph, &records))
}
