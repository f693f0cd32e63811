//! Load a flat JSON dump (`{"users": [...], "posts": [...]}`) into the
//! database configured by the environment.
//!
//! Usage: `quill-import [file]` — defaults to `data.json`.

use anyhow::Context;
use tracing::info;

use quill_db::{Database, transfer};
use quill_server::config::Config;
use quill_types::dump::DataDump;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "data.json".into());
    let cfg = Config::from_env()?;
    let db = Database::open(&cfg.db_path)?;

    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let dump: DataDump = serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
    transfer::import(&db, dump)?;

    info!("Loaded {} into {}", path, cfg.db_path.display());
    Ok(())
}
