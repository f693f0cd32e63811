//! Bulk import/export against the flat JSON dump document.

use crate::Database;
use anyhow::Result;
use quill_types::dump::{DataDump, PostDump, UserDump};
use rusqlite::params;
use tracing::info;

/// Load a dump into the database. Rows are inserted without explicit ids,
/// sorted by their original id first, so AUTOINCREMENT reassigns ids in the
/// same order (recency is derived from id order).
pub fn import(db: &Database, mut dump: DataDump) -> Result<()> {
    dump.users.sort_by_key(|u| u.id);
    dump.posts.sort_by_key(|p| p.id);

    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        for u in &dump.users {
            tx.execute(
                "INSERT INTO users (username, hashedGoogleId, avatar_url, memberSince)
                 VALUES (?1, ?2, ?3, ?4)",
                params![u.username, u.hashed_google_id, u.avatar_url, u.member_since],
            )?;
        }
        for p in &dump.posts {
            tx.execute(
                "INSERT INTO posts (title, content, username, timestamp, likes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![p.title, p.content, p.username, p.timestamp, p.likes],
            )?;
        }
        tx.commit()?;
        Ok(())
    })?;

    info!(
        "Imported {} users and {} posts",
        dump.users.len(),
        dump.posts.len()
    );
    Ok(())
}

/// Dump both tables, ordered by id.
pub fn export(db: &Database) -> Result<DataDump> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, username, hashedGoogleId, avatar_url, memberSince
             FROM users ORDER BY id",
        )?;
        let users = stmt
            .query_map([], |row| {
                Ok(UserDump {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    hashed_google_id: row.get(2)?,
                    avatar_url: row.get(3)?,
                    member_since: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT id, title, content, username, timestamp, likes
             FROM posts ORDER BY id",
        )?;
        let posts = stmt
            .query_map([], |row| {
                Ok(PostDump {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    username: row.get(3)?,
                    timestamp: row.get(4)?,
                    likes: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(DataDump { users, posts })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    fn user(id: i64, name: &str) -> UserDump {
        UserDump {
            id,
            username: name.to_string(),
            hashed_google_id: format!("hash-{name}"),
            avatar_url: None,
            member_since: "2024-01-01 08:00".to_string(),
        }
    }

    fn post(id: i64, title: &str, author: &str) -> PostDump {
        PostDump {
            id,
            title: title.to_string(),
            content: "content".to_string(),
            username: author.to_string(),
            timestamp: "2024-01-01 10:00".to_string(),
            likes: 0,
        }
    }

    #[test]
    fn import_preserves_id_order() {
        let (db, _dir) = test_db();
        // Deliberately out of order: the loader must sort before inserting.
        let dump = DataDump {
            users: vec![user(2, "bob"), user(1, "alice")],
            posts: vec![post(3, "third", "bob"), post(1, "first", "alice"), post(2, "second", "alice")],
        };
        import(&db, dump).unwrap();

        assert_eq!(db.get_user_by_id(1).unwrap().unwrap().username, "alice");
        assert_eq!(db.get_user_by_id(2).unwrap().unwrap().username, "bob");
        assert_eq!(db.get_post(1).unwrap().unwrap().title, "first");
        assert_eq!(db.get_post(3).unwrap().unwrap().title, "third");
    }

    #[test]
    fn export_round_trips() {
        let (db, _dir) = test_db();
        let dump = DataDump {
            users: vec![user(1, "alice"), user(2, "bob")],
            posts: vec![post(1, "t", "alice")],
        };
        import(&db, dump).unwrap();
        db.like_post_by(1, 2).unwrap();

        let out = export(&db).unwrap();
        assert_eq!(out.users.len(), 2);
        assert_eq!(out.users[0].username, "alice");
        assert_eq!(out.posts[0].likes, 1);

        // A fresh database loaded from the export matches.
        let dir2 = tempfile::tempdir().unwrap();
        let db2 = Database::open(&dir2.path().join("copy.db")).unwrap();
        import(&db2, out).unwrap();
        assert_eq!(db2.get_post(1).unwrap().unwrap().likes, 1);
    }
}
