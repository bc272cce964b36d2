//! Runtime settings for the api service
//!
//! Values come from the process environment through the `config` crate.
//! Integration secrets are optional; the endpoints that need a missing one
//! answer with an error instead of refusing to start.

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// ImgBB API key for gallery uploads
    #[serde(default)]
    pub imgbb_api_key: Option<String>,
    /// Football-Data.org v4 token
    #[serde(default)]
    pub football_data_token: Option<String>,
    /// Shared token for the gallery cleanup endpoint
    #[serde(default)]
    pub gallery_cleanup_token: Option<String>,
    /// Secret that lets a scheduler read fixtures without a session
    #[serde(default)]
    pub cron_secret: Option<String>,
    /// Directory holding the built PWA bundle
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default = "default_bind_addr")]
    pub api_bind_addr: String,
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

impl ApiConfig {
    /// Load from environment variables (`IMGBB_API_KEY`, `FOOTBALL_DATA_TOKEN`,
    /// `GALLERY_CLEANUP_TOKEN`, `CRON_SECRET`, `STATIC_DIR`, `API_BIND_ADDR`)
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .add_source(Environment::default())
            .build()?;

        let mut config: ApiConfig = settings.try_deserialize()?;
        for secret in [
            &mut config.imgbb_api_key,
            &mut config.football_data_token,
            &mut config.gallery_cleanup_token,
            &mut config.cron_secret,
        ] {
            if secret.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *secret = None;
            }
        }
        Ok(config)
    }
}
