use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            -- Column names are kept from the original data format so JSON
            -- dumps from earlier revisions import unchanged.
            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE,
                hashedGoogleId  TEXT NOT NULL UNIQUE,
                avatar_url      TEXT,
                memberSince     DATETIME NOT NULL
            );

            -- posts.username is a soft reference: rows survive author
            -- deletion by being rewritten to the sentinel username.
            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                username    TEXT NOT NULL,
                timestamp   DATETIME NOT NULL,
                likes       INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_posts_username ON posts(username);
            CREATE INDEX idx_posts_likes ON posts(likes);

            -- Server-side sessions; the cookie carries only the id. user_id
            -- is NULL for anonymous sessions (sort preference only).
            CREATE TABLE sessions (
                id                TEXT PRIMARY KEY,
                user_id           INTEGER,
                sort_key          TEXT NOT NULL DEFAULT 'id',
                oauth_state       TEXT,
                pending_identity  TEXT,
                created_at        TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_sessions_user ON sessions(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
