use crate::error::{LinkedInError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub linkedin: LinkedInConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
}

impl BridgeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BridgeConfig = toml::from_str(content)
            .map_err(|err| LinkedInError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            LinkedInError::InvalidConfig(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.linkedin.base_url.trim();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(LinkedInError::InvalidConfig(format!(
                "linkedin.base_url must be an http(s) URL, got `{base}`"
            )));
        }
        if self.realtime.heartbeat_interval_secs == 0 {
            return Err(LinkedInError::InvalidConfig(
                "realtime.heartbeat_interval_secs must be positive".into(),
            ));
        }
        if self.sync.page_size == 0 {
            return Err(LinkedInError::InvalidConfig(
                "sync.page_size must be positive".into(),
            ));
        }
        if self.backfill.default_count == 0 {
            return Err(LinkedInError::InvalidConfig(
                "backfill.default_count must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    #[serde(default = "LinkedInConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "LinkedInConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "LinkedInConfig::default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "LinkedInConfig::default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "LinkedInConfig::default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub track: TrackProfile,
}

impl LinkedInConfig {
    fn default_base_url() -> String {
        "https://www.linkedin.com".to_string()
    }

    fn default_user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string()
    }

    fn default_request_timeout() -> u64 {
        60
    }

    fn default_read_timeout() -> u64 {
        40
    }

    fn default_connect_timeout() -> u64 {
        10
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            user_agent: Self::default_user_agent(),
            request_timeout_secs: Self::default_request_timeout(),
            read_timeout_secs: Self::default_read_timeout(),
            connect_timeout_secs: Self::default_connect_timeout(),
            track: TrackProfile::default(),
        }
    }
}

/// Device profile reported in the `x-li-track` header. Defaults mimic a
/// desktop browser in central Europe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackProfile {
    #[serde(default = "TrackProfile::default_timezone")]
    pub timezone: String,
    #[serde(default = "TrackProfile::default_timezone_offset")]
    pub timezone_offset: i32,
    #[serde(default = "TrackProfile::default_display_density")]
    pub display_density: f64,
    #[serde(default = "TrackProfile::default_display_width")]
    pub display_width: u32,
    #[serde(default = "TrackProfile::default_display_height")]
    pub display_height: u32,
}

impl TrackProfile {
    fn default_timezone() -> String {
        "Europe/Berlin".to_string()
    }

    fn default_timezone_offset() -> i32 {
        1
    }

    fn default_display_density() -> f64 {
        1.0
    }

    fn default_display_width() -> u32 {
        1920
    }

    fn default_display_height() -> u32 {
        1080
    }
}

impl Default for TrackProfile {
    fn default() -> Self {
        Self {
            timezone: Self::default_timezone(),
            timezone_offset: Self::default_timezone_offset(),
            display_density: Self::default_display_density(),
            display_width: Self::default_display_width(),
            display_height: Self::default_display_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Expected server heartbeat period. Silence for three periods counts
    /// as a dropped connection.
    #[serde(default = "RealtimeConfig::default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "RealtimeConfig::default_max_backoff")]
    pub max_backoff_secs: u64,
    /// Consecutive 401/403 responses tolerated before the session is
    /// considered logged out.
    #[serde(default = "RealtimeConfig::default_max_unauthorized")]
    pub max_unauthorized: u32,
}

impl RealtimeConfig {
    fn default_heartbeat_interval() -> u64 {
        30
    }

    fn default_max_backoff() -> u64 {
        64
    }

    fn default_max_unauthorized() -> u32 {
        3
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs * 3)
    }

    /// Exponential backoff for the `attempt`th consecutive failure.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = 2u64.pow(attempt.min(6)).min(self.max_backoff_secs.max(1));
        Duration::from_secs(secs)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: Self::default_heartbeat_interval(),
            max_backoff_secs: Self::default_max_backoff(),
            max_unauthorized: Self::default_max_unauthorized(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Run a bulk conversation sync every time the bridge connects.
    #[serde(default = "SyncConfig::default_on_connect")]
    pub on_connect: bool,
    #[serde(default = "SyncConfig::default_page_size")]
    pub page_size: usize,
    /// Upper bound on conversations synced per connect (0 = unlimited).
    #[serde(default)]
    pub max_conversations: usize,
}

impl SyncConfig {
    fn default_on_connect() -> bool {
        true
    }

    fn default_page_size() -> usize {
        20
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            on_connect: Self::default_on_connect(),
            page_size: Self::default_page_size(),
            max_conversations: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    #[serde(default = "BackfillConfig::default_count")]
    pub default_count: usize,
}

impl BackfillConfig {
    fn default_count() -> usize {
        20
    }
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            default_count: Self::default_count(),
        }
    }
}
