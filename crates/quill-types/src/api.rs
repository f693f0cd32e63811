use serde::{Deserialize, Serialize};

// -- Sorting --

/// Post ordering for the home listing. Selected per request via `?sort=` and
/// remembered in the caller's session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Id,
    Likes,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Likes => "likes",
        }
    }

    /// Parse the value stored in the session row; anything unrecognized
    /// falls back to the default ordering.
    pub fn from_stored(s: &str) -> Self {
        match s {
            "likes" => SortKey::Likes,
            _ => SortKey::Id,
        }
    }
}

// -- Auth forms --

/// Field names match the original registration/login forms.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(rename = "registerUsername")]
    pub register_username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(rename = "loginUsername")]
    pub login_username: String,
}

/// Username chosen for a pending external identity after an OAuth login
/// that didn't match an existing account.
#[derive(Debug, Deserialize)]
pub struct ChooseUsernameForm {
    pub username: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
pub struct CreatePostForm {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub username: String,
    pub timestamp: String,
    pub likes: i64,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub likes: i64,
}

// -- Users --

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub member_since: String,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub posts: Vec<PostResponse>,
    pub user: Option<UserResponse>,
    pub sort: SortKey,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub posts: Vec<PostResponse>,
}

// -- Profile forms --

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateForm {
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_round_trip() {
        assert_eq!(SortKey::from_stored("likes"), SortKey::Likes);
        assert_eq!(SortKey::from_stored("id"), SortKey::Id);
        assert_eq!(SortKey::from_stored("garbage"), SortKey::Id);
        assert_eq!(SortKey::Likes.as_str(), "likes");
    }

    #[test]
    fn login_form_uses_original_field_name() {
        let form: LoginForm = serde_json::from_str(r#"{"loginUsername":"alice"}"#).unwrap();
        assert_eq!(form.login_username, "alice");
    }
}
