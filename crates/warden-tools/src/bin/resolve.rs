//! Policy Resolve Tool
//!
//! Resolves a JSON policy document into the flat, ordered record list that
//! gets persisted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin resolve -- --account acme --owner acme:user:admin policy.json
//! ```

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use warden_tools::{resolve_file, ResolveOptions};

#[derive(Parser, Debug)]
#[command(name = "resolve")]
#[command(about = "Resolve a policy document into an ordered record list")]
struct Args {
    /// Path to the policy document (JSON)
    input: PathBuf,

    /// Account assigned to records without one
    #[arg(short, long)]
    account: String,

    /// Owner of top-level records, as account:kind:id
    #[arg(long)]
    owner: String,

    /// Omit accounts and owners equal to the defaults
    #[arg(long)]
    compact: bool,

    /// Write the resolved records here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    warden_tools::init_logging();

    let args = Args::parse();

    if !args.input.is_file() {
        error!("'{}' is not a file", args.input.display());
        process::exit(1);
    }

    let options = ResolveOptions {
        account: args.account,
        ownerid: args.owner,
        compact: args.compact,
    };

    let resolved = match resolve_file(&args.input, &options) {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&resolved) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to render resolved records: {}", e);
            process::exit(1);
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(e) = fs::write(path, json + "\n") {
                error!("Failed to write '{}': {}", path.display(), e);
                process::exit(1);
            }
            info!("Wrote resolved records to {}", path.display());
        }
        None => println!("{json}"),
    }
}
