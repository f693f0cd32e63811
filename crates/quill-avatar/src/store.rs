use anyhow::Result;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

use crate::{DEFAULT_SIZE, generate};

/// On-disk avatar storage, one PNG per user named by numeric id.
pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Avatar directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, user_id: i64) -> PathBuf {
        self.dir.join(format!("{user_id}.png"))
    }

    /// Read the stored avatar, generating and persisting it on first request.
    pub async fn load_or_generate(&self, user_id: i64, letter: char) -> Result<Vec<u8>> {
        let path = self.file_path(user_id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let bytes = generate(letter, DEFAULT_SIZE, DEFAULT_SIZE)?;
                fs::write(&path, &bytes).await?;
                info!("Generated avatar for user {} ('{}')", user_id, letter);
                Ok(bytes)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the stored avatar, e.g. after a username change.
    pub async fn regenerate(&self, user_id: i64, letter: char) -> Result<Vec<u8>> {
        let bytes = generate(letter, DEFAULT_SIZE, DEFAULT_SIZE)?;
        fs::write(self.file_path(user_id), &bytes).await?;
        Ok(bytes)
    }

    /// Remove a user's avatar file.
    pub async fn delete(&self, user_id: i64) -> Result<()> {
        let path = self.file_path(user_id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted avatar for user {}", user_id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Avatar for user {} already gone", user_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lazily_generates_then_reuses_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AvatarStore::new(dir.path().join("avatars")).await.unwrap();

        assert!(!store.file_path(1).exists());
        let first = store.load_or_generate(1, 'a').await.unwrap();
        assert!(store.file_path(1).exists());

        // Second request serves the persisted bytes.
        let second = store.load_or_generate(1, 'a').await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = AvatarStore::new(dir.path().join("avatars")).await.unwrap();

        store.load_or_generate(7, 'q').await.unwrap();
        store.delete(7).await.unwrap();
        assert!(!store.file_path(7).exists());
        // Missing file is logged, not an error.
        store.delete(7).await.unwrap();
    }

    #[tokio::test]
    async fn regenerate_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = AvatarStore::new(dir.path().join("avatars")).await.unwrap();

        let a = store.load_or_generate(3, 'a').await.unwrap();
        let b = store.regenerate(3, 'b').await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.load_or_generate(3, 'b').await.unwrap(), b);
    }
}
