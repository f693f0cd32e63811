/// Database row types — these map directly to SQLite rows.
/// Distinct from the quill-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub hashed_google_id: String,
    pub avatar_url: Option<String>,
    pub member_since: String,
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub username: String,
    pub timestamp: String,
    pub likes: i64,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: Option<i64>,
    pub sort_key: String,
    pub oauth_state: Option<String>,
    pub pending_identity: Option<String>,
    pub created_at: String,
}
