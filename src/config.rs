//! Runtime configuration loaded from the environment
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file by `dotenvy` in `main`.

use std::env;

/// Server configuration
///
/// | Env Var              | Default                                  |
/// |----------------------|------------------------------------------|
/// | `PORT`               | `8080`                                   |
/// | `DATABASE_URL`       | `data.db`                                |
/// | `SESSION_TTL_HOURS`  | `24`                                     |
/// | `THEME_STORAGE_KEY`  | `theme-preference`                       |
/// | `RESET_REDIRECT_URL` | `http://localhost:{PORT}/reset-password` |
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub session_ttl_hours: i64,
    pub theme_storage_key: String,
    pub reset_redirect_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "data.db".to_string(),
            session_ttl_hours: 24,
            theme_storage_key: "theme-preference".to_string(),
            reset_redirect_url: "http://localhost:8080/reset-password".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults.
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse().ok())
            .filter(|h: &i64| *h > 0)
            .unwrap_or(defaults.session_ttl_hours);

        let reset_redirect_url = env::var("RESET_REDIRECT_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}/reset-password"));

        Self {
            port,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            session_ttl_hours,
            theme_storage_key: env::var("THEME_STORAGE_KEY")
                .unwrap_or(defaults.theme_storage_key),
            reset_redirect_url,
        }
    }
}
