use std::time::Duration;

/// Default backend base URL for local development.
const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
/// Default HTTP timeout for backend calls, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Cached sessions older than this are treated as absent.
const DEFAULT_CACHE_MAX_AGE_DAYS: i64 = 30;
/// Delay before a navigation- or visibility-triggered sync.
const DEFAULT_SYNC_DEBOUNCE_MS: u64 = 100;
/// Minimum interval between confirmation-email resends for one address.
const DEFAULT_RESEND_COOLDOWN_SECS: u64 = 60;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub backend_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Maximum age of the encrypted session cache.
    pub cache_max_age: chrono::Duration,
    /// Debounce applied to route-change and visibility-change syncs.
    pub sync_debounce: Duration,
    /// Client-side cooldown for resending confirmation emails.
    pub resend_cooldown: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                  |
    /// |------------------------------|--------------------------|
    /// | `BACKEND_API_URL`            | `http://localhost:8000`  |
    /// | `BACKEND_TIMEOUT_SECS`       | `30`                     |
    /// | `SESSION_CACHE_MAX_AGE_DAYS` | `30`                     |
    /// | `SESSION_SYNC_DEBOUNCE_MS`   | `100`                    |
    /// | `RESEND_COOLDOWN_SECS`       | `60`                     |
    ///
    /// `NEXT_PUBLIC_BACKEND_API_URL` is honoured when `BACKEND_API_URL` is unset.
    ///
    /// # Panics
    ///
    /// Panics if a numeric variable is set but does not parse.
    pub fn from_env() -> Self {
        let backend_url = std::env::var("BACKEND_API_URL")
            .or_else(|_| std::env::var("NEXT_PUBLIC_BACKEND_API_URL"))
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.into());

        let timeout_secs: u64 = std::env::var("BACKEND_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("BACKEND_TIMEOUT_SECS must be a valid u64");

        let max_age_days: i64 = std::env::var("SESSION_CACHE_MAX_AGE_DAYS")
            .unwrap_or_else(|_| DEFAULT_CACHE_MAX_AGE_DAYS.to_string())
            .parse()
            .expect("SESSION_CACHE_MAX_AGE_DAYS must be a valid i64");

        let debounce_ms: u64 = std::env::var("SESSION_SYNC_DEBOUNCE_MS")
            .unwrap_or_else(|_| DEFAULT_SYNC_DEBOUNCE_MS.to_string())
            .parse()
            .expect("SESSION_SYNC_DEBOUNCE_MS must be a valid u64");

        let cooldown_secs: u64 = std::env::var("RESEND_COOLDOWN_SECS")
            .unwrap_or_else(|_| DEFAULT_RESEND_COOLDOWN_SECS.to_string())
            .parse()
            .expect("RESEND_COOLDOWN_SECS must be a valid u64");

        Self {
            backend_url: normalize_base_url(&backend_url),
            request_timeout: Duration::from_secs(timeout_secs),
            cache_max_age: chrono::Duration::days(max_age_days),
            sync_debounce: Duration::from_millis(debounce_ms),
            resend_cooldown: Duration::from_secs(cooldown_secs),
        }
    }

    /// Defaults pointed at an explicit backend URL.
    pub fn with_backend_url(backend_url: &str) -> Self {
        Self {
            backend_url: normalize_base_url(backend_url),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_max_age: chrono::Duration::days(DEFAULT_CACHE_MAX_AGE_DAYS),
            sync_debounce: Duration::from_millis(DEFAULT_SYNC_DEBOUNCE_MS),
            resend_cooldown: Duration::from_secs(DEFAULT_RESEND_COOLDOWN_SECS),
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
