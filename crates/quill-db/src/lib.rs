pub mod migrations;
pub mod models;
pub mod queries;
pub mod transfer;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Placeholder author for posts whose account has been deleted. Registration
/// refuses this name so it can never collide with a real user.
pub const DELETED_USER: &str = "deleted";

/// Timestamp format stored in the `memberSince` and `timestamp` columns.
pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Current local time in the stored timestamp format.
pub fn now_stamp() -> String {
    chrono::Local::now().format(STAMP_FORMAT).to_string()
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}
