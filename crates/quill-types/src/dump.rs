use serde::{Deserialize, Serialize};

/// Flat JSON document used for bulk import/export.
///
/// Field names are the original data format (`hashedGoogleId`,
/// `memberSince`), so dumps written by earlier revisions of the app load
/// unchanged. On import both arrays are sorted by `id` before insertion so
/// AUTOINCREMENT hands out ids in the original order.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DataDump {
    pub users: Vec<UserDump>,
    pub posts: Vec<PostDump>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserDump {
    pub id: i64,
    pub username: String,
    #[serde(rename = "hashedGoogleId")]
    pub hashed_google_id: String,
    pub avatar_url: Option<String>,
    #[serde(rename = "memberSince")]
    pub member_since: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostDump {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub username: String,
    pub timestamp: String,
    pub likes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_uses_original_field_names() {
        let doc = r#"{
            "users": [
                {"id": 1, "username": "alice", "hashedGoogleId": "abc",
                 "avatar_url": null, "memberSince": "2024-01-01 08:00"}
            ],
            "posts": [
                {"id": 1, "title": "t", "content": "c", "username": "alice",
                 "timestamp": "2024-01-01 10:00", "likes": 0}
            ]
        }"#;
        let dump: DataDump = serde_json::from_str(doc).unwrap();
        assert_eq!(dump.users[0].hashed_google_id, "abc");
        assert_eq!(dump.users[0].member_since, "2024-01-01 08:00");

        let out = serde_json::to_string(&dump).unwrap();
        assert!(out.contains("hashedGoogleId"));
        assert!(out.contains("memberSince"));
    }
}
