use axum::{Json, extract::State};
use serde_json::Value;
use tracing::{info, warn};

use crate::AppState;

const CATALOG_ENDPOINT: &str = "https://emoji-api.com/emojis";

/// Fetch the emoji catalog once at startup. Failures leave the catalog
/// empty; the site works without it.
pub async fn fetch_catalog(client: &reqwest::Client, api_key: Option<&str>) -> Value {
    let Some(key) = api_key else {
        info!("EMOJI_API_KEY not set; emoji picker disabled");
        return Value::Array(Vec::new());
    };

    match try_fetch(client, key).await {
        Ok(catalog) => {
            info!("Fetched {} emojis", catalog.as_array().map_or(0, Vec::len));
            catalog
        }
        Err(e) => {
            warn!("Emoji catalog fetch failed: {e:#}");
            Value::Array(Vec::new())
        }
    }
}

async fn try_fetch(client: &reqwest::Client, key: &str) -> anyhow::Result<Value> {
    let value: Value = client
        .get(CATALOG_ENDPOINT)
        .query(&[("access_key", key)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    anyhow::ensure!(value.is_array(), "catalog response is not an array");
    Ok(value)
}

/// GET /emojis — the process-wide cache.
pub async fn list_emojis(State(state): State<AppState>) -> Json<Value> {
    Json(state.emojis.clone())
}
