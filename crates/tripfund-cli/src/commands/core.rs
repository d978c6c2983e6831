//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `open_backing` - Pick the backing store for session commands
//! - `analysis_client` - Build the text-generation client
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use tripfund_core::ai::{AIBackend, AIClient};
use tripfund_core::db::Database;
use tripfund_core::store::{BackingStore, RemoteBackend};

/// Environment variable holding the API key for `--server`
pub const SERVER_API_KEY_ENV: &str = "TRIPFUND_API_KEY";

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Backing store for session commands: a remote server when given, else the local database
pub fn open_backing(db_path: &Path, no_encrypt: bool, server: Option<&str>) -> Result<BackingStore> {
    match server {
        Some(url) => {
            let api_key = std::env::var(SERVER_API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty());
            debug!(url, "Using remote backing store");
            Ok(BackingStore::Remote(RemoteBackend::new(
                url,
                api_key.as_deref(),
            )))
        }
        None => Ok(BackingStore::Sqlite(open_db(db_path, no_encrypt)?)),
    }
}

/// Text-generation client from the environment, optionally with another model
pub fn analysis_client(model: Option<&str>) -> Result<AIClient> {
    let client = AIClient::from_env().context("Invalid analysis configuration")?;
    let client = match model {
        Some(model) => client.with_model(model),
        None => client,
    };
    debug!(model = %client.model(), host = %client.host(), "Analysis client ready");
    Ok(client)
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    // Migrations run on open
    let db = open_db(db_path, no_encrypt)?;
    debug!(path = %db.path(), "Database ready");

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record an expense: tripfund expenses --user me add food 88 dumplings");
    println!("  2. Check the budget: tripfund summary --user me --budget 10000");
    println!("  3. Start web UI: tripfund serve");

    Ok(())
}
