use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://earthmaps.io";
pub const DEFAULT_GEOSERVER_BASE_URL: &str = "https://gs.earthmaps.io/geoserver";

/// What happens to the previously committed payloads when a new fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearPolicy {
    /// Clear payloads as soon as the new fetch begins. Consumers see a null
    /// window while the request is in flight and must render a loading state.
    Eager,
    /// Keep the previous payloads visible until the new pair settles.
    OnSettle,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub geoserver_base_url: String,
    pub static_fixtures: bool,
    pub clear_policy: ClearPolicy,
    pub slow_threshold: Duration,
    pub hard_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            api_base_url: env::var("SNAP_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            geoserver_base_url: env::var("GEOSERVER_URL")
                .unwrap_or_else(|_| DEFAULT_GEOSERVER_BASE_URL.to_string()),
            static_fixtures: env::var("HYDROVIZ_USE_STATIC_FIXTURES")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            clear_policy: ClearPolicy::Eager,
            slow_threshold: Duration::from_secs(
                env::var("SLOW_THRESHOLD_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            ),
            hard_timeout: Duration::from_secs(
                env::var("HARD_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            geoserver_base_url: DEFAULT_GEOSERVER_BASE_URL.to_string(),
            static_fixtures: false,
            clear_policy: ClearPolicy::Eager,
            slow_threshold: Duration::from_secs(10),
            hard_timeout: Duration::from_secs(60),
        }
    }
}
