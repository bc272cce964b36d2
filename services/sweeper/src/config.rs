use anyhow::Result;
use std::env;

/// Hourly, on the hour (seconds-resolution cron)
pub const DEFAULT_CLEANUP_SCHEDULE: &str = "0 0 * * * *";

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Base URL of the api service
    pub api_base_url: String,
    pub cleanup_schedule: String,
    pub cleanup_token: Option<String>,
    /// Cache warming is off unless a schedule is given
    pub fixtures_warm_schedule: Option<String>,
    pub cron_secret: Option<String>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SweeperConfig {
    /// Read the configuration from environment variables
    ///
    /// # Environment Variables
    /// - `API_BASE_URL`: api service address (default: "http://localhost:3001")
    /// - `CLEANUP_SCHEDULE`: cron expression for the gallery sweep (default: hourly)
    /// - `GALLERY_CLEANUP_TOKEN`: bearer token accepted by the cleanup endpoint
    /// - `FIXTURES_WARM_SCHEDULE`: optional cron expression for fixtures warming
    /// - `CRON_SECRET`: secret accepted by the fixtures endpoint
    pub fn from_env() -> Result<Self> {
        let api_base_url = optional("API_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3001".to_string())
            .trim_end_matches('/')
            .to_string();

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            anyhow::bail!("API_BASE_URL must be an http(s) URL, got {}", api_base_url);
        }

        Ok(SweeperConfig {
            api_base_url,
            cleanup_schedule: optional("CLEANUP_SCHEDULE")
                .unwrap_or_else(|| DEFAULT_CLEANUP_SCHEDULE.to_string()),
            cleanup_token: optional("GALLERY_CLEANUP_TOKEN"),
            fixtures_warm_schedule: optional("FIXTURES_WARM_SCHEDULE"),
            cron_secret: optional("CRON_SECRET"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for name in [
            "API_BASE_URL",
            "CLEANUP_SCHEDULE",
            "GALLERY_CLEANUP_TOKEN",
            "FIXTURES_WARM_SCHEDULE",
            "CRON_SECRET",
        ] {
            unsafe {
                env::remove_var(name);
            }
        }
    }

    #[test]
    #[serial]
    fn defaults() {
        clear();
        let config = SweeperConfig::from_env().unwrap();
        assert_eq!(config.api_base_url, "http://localhost:3001");
        assert_eq!(config.cleanup_schedule, DEFAULT_CLEANUP_SCHEDULE);
        assert!(config.cleanup_token.is_none());
        assert!(config.fixtures_warm_schedule.is_none());
    }

    #[test]
    #[serial]
    fn overrides_and_blank_values() {
        clear();
        unsafe {
            env::set_var("API_BASE_URL", "https://trophies.example.com/");
            env::set_var("GALLERY_CLEANUP_TOKEN", "sweep");
            env::set_var("FIXTURES_WARM_SCHEDULE", "   ");
        }
        let config = SweeperConfig::from_env().unwrap();
        assert_eq!(config.api_base_url, "https://trophies.example.com");
        assert_eq!(config.cleanup_token.as_deref(), Some("sweep"));
        assert!(config.fixtures_warm_schedule.is_none());

        unsafe {
            env::set_var("API_BASE_URL", "ftp://nope");
        }
        assert!(SweeperConfig::from_env().is_err());
        clear();
    }
}
