use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub avatar_dir: PathBuf,
    pub emoji_api_key: Option<String>,
    pub google: Option<GoogleConfig>,
}

impl Config {
    /// Read configuration from the environment. The binaries load a `.env`
    /// file first, so development setups need no exported variables.
    pub fn from_env() -> Result<Self> {
        let host = env::var("QUILL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env::var("QUILL_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("QUILL_PORT must be a port number")?;
        let db_path: PathBuf = env::var("QUILL_DB_PATH")
            .unwrap_or_else(|_| "quill.db".into())
            .into();
        let avatar_dir: PathBuf = env::var("QUILL_AVATAR_DIR")
            .unwrap_or_else(|_| "./avatars".into())
            .into();
        let emoji_api_key = env::var("EMOJI_API_KEY").ok().filter(|k| !k.is_empty());

        let google = match (
            env::var("GOOGLE_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            env::var("GOOGLE_CLIENT_SECRET").ok().filter(|v| !v.is_empty()),
        ) {
            (Some(client_id), Some(client_secret)) => {
                let redirect_url = env::var("GOOGLE_REDIRECT_URL").unwrap_or_else(|_| {
                    format!("http://localhost:{port}/auth/google/callback")
                });
                Some(GoogleConfig {
                    client_id,
                    client_secret,
                    redirect_url,
                })
            }
            _ => None,
        };

        Ok(Self {
            host,
            port,
            db_path,
            avatar_dir,
            emoji_api_key,
            google,
        })
    }
}
