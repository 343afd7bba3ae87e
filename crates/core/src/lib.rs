pub mod api;
pub mod app;
pub mod chart;
pub mod domain;
pub mod render;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
    const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_PREFERENCES_PATH: &str = ".usalpha/preferences.json";
    const DEFAULT_RENDER_OUT_DIR: &str = "render";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_base_url: String,
        pub api_timeout: Duration,
        pub preferences_path: PathBuf,
        pub render_out_dir: PathBuf,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let api_timeout_secs = match std::env::var("API_TIMEOUT_SECS") {
                Ok(s) => s
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("API_TIMEOUT_SECS is not a number: {s}"))?,
                Err(_) => DEFAULT_API_TIMEOUT_SECS,
            };
            anyhow::ensure!(api_timeout_secs >= 1, "API_TIMEOUT_SECS must be >= 1");

            Ok(Self {
                api_base_url: non_empty_var("API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
                api_timeout: Duration::from_secs(api_timeout_secs),
                preferences_path: non_empty_var("PREFERENCES_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFERENCES_PATH)),
                render_out_dir: non_empty_var("RENDER_OUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDER_OUT_DIR)),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                api_base_url: DEFAULT_API_BASE_URL.to_string(),
                api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
                preferences_path: PathBuf::from(DEFAULT_PREFERENCES_PATH),
                render_out_dir: PathBuf::from(DEFAULT_RENDER_OUT_DIR),
                sentry_dsn: None,
            }
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
