use crate::models::{PostRow, SessionRow, UserRow};
use crate::{DELETED_USER, Database};
use anyhow::{Result, bail};
use quill_types::api::SortKey;
use rusqlite::{Connection, OptionalExtension, params};

impl Database {
    // -- Users --

    /// Insert a user and return the assigned id.
    pub fn create_user(
        &self,
        username: &str,
        hashed_google_id: &str,
        member_since: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, hashedGoogleId, memberSince) VALUES (?1, ?2, ?3)",
                params![username, hashed_google_id, member_since],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", params![username]))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", params![id]))
    }

    pub fn get_user_by_identity(&self, hashed_google_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "hashedGoogleId = ?1", params![hashed_google_id]))
    }

    pub fn set_avatar_url(&self, user_id: i64, avatar_url: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET avatar_url = ?1 WHERE id = ?2",
                params![avatar_url, user_id],
            )?;
            Ok(())
        })
    }

    /// Rename a user and re-attribute every post they authored, in one
    /// transaction. A stored avatar URL follows the new name.
    pub fn rename_user(&self, old: &str, new: &str) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let changed = tx.execute(
                "UPDATE users
                 SET username = ?2,
                     avatar_url = CASE WHEN avatar_url IS NULL
                                       THEN NULL
                                       ELSE '/avatar/' || ?2 END
                 WHERE username = ?1",
                params![old, new],
            )?;
            if changed == 0 {
                bail!("no such user: {old}");
            }
            tx.execute(
                "UPDATE posts SET username = ?2 WHERE username = ?1",
                params![old, new],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Delete an account: the user's posts are re-attributed to the sentinel
    /// username, their sessions dropped, and the user row removed — all in
    /// one transaction so a crash can't leave a dangling author reference.
    pub fn delete_user(&self, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let username: Option<String> = tx
                .query_row(
                    "SELECT username FROM users WHERE id = ?1",
                    [user_id],
                    |r| r.get(0),
                )
                .optional()?;
            let Some(username) = username else {
                bail!("no such user: {user_id}");
            };
            tx.execute(
                "UPDATE posts SET username = ?1 WHERE username = ?2",
                params![DELETED_USER, username],
            )?;
            tx.execute("DELETE FROM sessions WHERE user_id = ?1", [user_id])?;
            tx.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Posts --

    pub fn create_post(
        &self,
        title: &str,
        content: &str,
        username: &str,
        timestamp: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (title, content, username, timestamp, likes)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![title, content, username, timestamp],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, content, username, timestamp, likes
                 FROM posts WHERE id = ?1",
                [id],
                map_post,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// All posts, newest-first by the requested key. Ties on the like count
    /// fall back to id so the ordering is total.
    pub fn list_posts(&self, sort: SortKey) -> Result<Vec<PostRow>> {
        let order = match sort {
            SortKey::Id => "id DESC",
            SortKey::Likes => "likes DESC, id DESC",
        };
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, title, content, username, timestamp, likes
                 FROM posts ORDER BY {order}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn posts_by_user(&self, username: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, username, timestamp, likes
                 FROM posts WHERE username = ?1 ORDER BY id DESC",
            )?;
            let rows = stmt
                .query_map([username], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Apply a like from `liker_id`. Returns (changed, likes): changed is
    /// false when the liker authored the post, which never increments. None
    /// means the post doesn't exist.
    ///
    /// Ownership is resolved through the author's user row. Posts attributed
    /// to the sentinel username have none, so anyone may like them.
    pub fn like_post_by(&self, post_id: i64, liker_id: i64) -> Result<Option<(bool, i64)>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let post: Option<(String, i64)> = tx
                .query_row(
                    "SELECT username, likes FROM posts WHERE id = ?1",
                    [post_id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;
            let Some((author, likes)) = post else {
                return Ok(None);
            };

            let author_id: Option<i64> = tx
                .query_row(
                    "SELECT id FROM users WHERE username = ?1",
                    [&author],
                    |r| r.get(0),
                )
                .optional()?;
            if author_id == Some(liker_id) {
                return Ok(Some((false, likes)));
            }

            tx.execute(
                "UPDATE posts SET likes = likes + 1 WHERE id = ?1",
                [post_id],
            )?;
            tx.commit()?;
            Ok(Some((true, likes + 1)))
        })
    }

    /// Returns true if a row was deleted.
    pub fn delete_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, user_id: Option<i64>, sort_key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, sort_key) VALUES (?1, ?2, ?3)",
                params![id, user_id, sort_key],
            )?;
            Ok(())
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, sort_key, oauth_state, pending_identity, created_at
                 FROM sessions WHERE id = ?1",
                [id],
                |row| {
                    Ok(SessionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        sort_key: row.get(2)?,
                        oauth_state: row.get(3)?,
                        pending_identity: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn set_session_sort(&self, id: &str, sort_key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET sort_key = ?1 WHERE id = ?2",
                params![sort_key, id],
            )?;
            Ok(())
        })
    }

    pub fn set_session_oauth_state(&self, id: &str, state: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET oauth_state = ?1 WHERE id = ?2",
                params![state, id],
            )?;
            Ok(())
        })
    }

    pub fn set_session_pending_identity(&self, id: &str, identity: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET pending_identity = ?1 WHERE id = ?2",
                params![identity, id],
            )?;
            Ok(())
        })
    }
}

fn query_user(
    conn: &Connection,
    filter: &str,
    args: impl rusqlite::Params,
) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, hashedGoogleId, avatar_url, memberSince
         FROM users WHERE {filter}"
    );
    conn.query_row(&sql, args, |row| {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            hashed_google_id: row.get(2)?,
            avatar_url: row.get(3)?,
            member_since: row.get(4)?,
        })
    })
    .optional()
    .map_err(Into::into)
}

fn map_post(row: &rusqlite::Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        username: row.get(3)?,
        timestamp: row.get(4)?,
        likes: row.get(5)?,
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

    fn add_user(db: &Database, name: &str) -> i64 {
        db.create_user(name, &format!("hash-{name}"), "2024-01-01 08:00")
            .unwrap()
    }

    #[test]
    fn create_and_fetch_user() {
        let (db, _dir) = test_db();
        let id = add_user(&db, "alice");

        let user = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.hashed_google_id, "hash-alice");
        assert!(user.avatar_url.is_none());

        assert!(db.get_user_by_username("bob").unwrap().is_none());
        assert!(db.get_user_by_identity("hash-alice").unwrap().is_some());
    }

    #[test]
    fn duplicate_username_is_an_error() {
        let (db, _dir) = test_db();
        add_user(&db, "alice");
        assert!(db.create_user("alice", "other-hash", "2024-01-02 08:00").is_err());
    }

    #[test]
    fn like_increments_by_exactly_one_except_for_the_author() {
        let (db, _dir) = test_db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let id = db
            .create_post("t", "c", "alice", "2024-01-01 10:00")
            .unwrap();

        assert_eq!(db.like_post_by(id, bob).unwrap(), Some((true, 1)));
        assert_eq!(db.like_post_by(id, bob).unwrap(), Some((true, 2)));

        // The author's own like never changes the count.
        assert_eq!(db.like_post_by(id, alice).unwrap(), Some((false, 2)));
        assert_eq!(db.get_post(id).unwrap().unwrap().likes, 2);

        assert_eq!(db.like_post_by(9999, bob).unwrap(), None);
    }

    #[test]
    fn sentinel_owned_posts_are_likeable_by_anyone() {
        let (db, _dir) = test_db();
        let alice = add_user(&db, "alice");
        db.create_post("t", "c", "alice", "2024-01-01 10:00").unwrap();
        db.delete_user(alice).unwrap();

        let orphan = &db.posts_by_user(DELETED_USER).unwrap()[0];
        // No author row resolves for the sentinel, so even the original
        // author's old id may like it.
        assert_eq!(db.like_post_by(orphan.id, alice).unwrap(), Some((true, 1)));
    }

    #[test]
    fn sort_orders_are_total_and_descending() {
        let (db, _dir) = test_db();
        add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let a = db.create_post("a", "c", "alice", "2024-01-01 10:00").unwrap();
        let b = db.create_post("b", "c", "alice", "2024-01-01 11:00").unwrap();
        let c = db.create_post("c", "c", "alice", "2024-01-01 12:00").unwrap();
        db.like_post_by(b, bob).unwrap();
        db.like_post_by(b, bob).unwrap();
        // a and c tie on zero likes; id breaks the tie
        let by_id: Vec<i64> = db
            .list_posts(SortKey::Id)
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(by_id, vec![c, b, a]);

        let by_likes: Vec<i64> = db
            .list_posts(SortKey::Likes)
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(by_likes, vec![b, c, a]);
    }

    #[test]
    fn rename_rewrites_user_and_posts_together() {
        let (db, _dir) = test_db();
        let id = add_user(&db, "alice");
        db.set_avatar_url(id, "/avatar/alice").unwrap();
        db.create_post("t1", "c", "alice", "2024-01-01 10:00").unwrap();
        db.create_post("t2", "c", "alice", "2024-01-01 11:00").unwrap();
        add_user(&db, "bob");
        db.create_post("t3", "c", "bob", "2024-01-01 12:00").unwrap();

        db.rename_user("alice", "alicia").unwrap();

        let user = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(user.username, "alicia");
        assert_eq!(user.avatar_url.as_deref(), Some("/avatar/alicia"));
        assert!(db.posts_by_user("alice").unwrap().is_empty());
        assert_eq!(db.posts_by_user("alicia").unwrap().len(), 2);
        assert_eq!(db.posts_by_user("bob").unwrap().len(), 1);

        assert!(db.rename_user("nobody", "whatever").is_err());
    }

    #[test]
    fn delete_user_reassigns_posts_to_sentinel() {
        let (db, _dir) = test_db();
        let id = add_user(&db, "alice");
        db.create_post("t1", "c", "alice", "2024-01-01 10:00").unwrap();
        db.create_post("t2", "c", "alice", "2024-01-01 11:00").unwrap();
        db.create_session("sess-1", Some(id), "id").unwrap();

        db.delete_user(id).unwrap();

        assert!(db.get_user_by_id(id).unwrap().is_none());
        assert!(db.posts_by_user("alice").unwrap().is_empty());
        assert_eq!(db.posts_by_user(DELETED_USER).unwrap().len(), 2);
        assert!(db.get_session("sess-1").unwrap().is_none());
    }

    #[test]
    fn session_round_trip() {
        let (db, _dir) = test_db();
        let id = add_user(&db, "alice");
        db.create_session("sess-1", Some(id), "id").unwrap();

        let sess = db.get_session("sess-1").unwrap().unwrap();
        assert_eq!(sess.user_id, Some(id));
        assert_eq!(sess.sort_key, "id");
        assert!(sess.oauth_state.is_none());

        db.set_session_sort("sess-1", "likes").unwrap();
        db.set_session_oauth_state("sess-1", Some("nonce")).unwrap();
        db.set_session_pending_identity("sess-1", Some("hash")).unwrap();
        let sess = db.get_session("sess-1").unwrap().unwrap();
        assert_eq!(sess.sort_key, "likes");
        assert_eq!(sess.oauth_state.as_deref(), Some("nonce"));
        assert_eq!(sess.pending_identity.as_deref(), Some("hash"));

        db.delete_session("sess-1").unwrap();
        assert!(db.get_session("sess-1").unwrap().is_none());
    }
}
