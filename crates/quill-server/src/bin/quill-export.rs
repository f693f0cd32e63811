//! Dump the users and posts tables to a flat JSON document.
//!
//! Usage: `quill-export [file]` — defaults to `data.json`.

use anyhow::Context;
use tracing::info;

use quill_db::{Database, transfer};
use quill_server::config::Config;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "data.json".into());
    let cfg = Config::from_env()?;
    let db = Database::open(&cfg.db_path)?;

    let dump = transfer::export(&db)?;
    let json = serde_json::to_string_pretty(&dump)?;
    std::fs::write(&path, json).with_context(|| format!("writing {path}"))?;

    info!(
        "Exported {} users and {} posts to {}",
        dump.users.len(),
        dump.posts.len(),
        path
    );
    Ok(())
}
