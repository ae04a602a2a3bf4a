//! CLI command implementations

pub mod doctor;
pub mod list;
pub mod logs;
pub mod seed;
pub mod setup;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use uuid::Uuid;

use arrowledger_core::{Identity, LedgerContext, Role};

/// Get the ledger directory from environment or default
pub fn get_ledger_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ARROWLEDGER_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .expect("Could not find home directory")
            .join(".arrowledger")
    }
}

/// Get or create the ledger context
pub fn get_context() -> Result<LedgerContext> {
    let ledger_dir = get_ledger_dir();

    std::fs::create_dir_all(&ledger_dir)
        .with_context(|| format!("Failed to create ledger directory: {:?}", ledger_dir))?;

    LedgerContext::new(&ledger_dir).context("Failed to initialize ledger context")
}

/// The identity the operator CLI acts under.
///
/// The CLI talks to the local database directly, below the identity layer,
/// so it carries a synthetic admin identity for the admin-gated services.
pub fn operator_identity() -> Identity {
    Identity::new(Uuid::nil(), Role::Admin)
}
