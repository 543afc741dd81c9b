use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const HISTORY_CAPACITY: usize = 50; // signals retained for late joiners
pub const KEEPALIVE_INTERVAL_SECS: u64 = 25; // under common proxy idle timeouts
pub const MAX_KEEPALIVE_SECS: u64 = 86_400;
pub const SUBSCRIBER_BUFFER: usize = 256; // frames queued per subscriber before it counts as stalled
pub const DEFAULT_CONFIG_FILE: &str = "sigrelay.toml";

/// Top-level config (sigrelay.toml + SIGRELAY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub hub: HubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow any origin to call the API from a browser.
    #[serde(default = "bool_true")]
    pub cors: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors: true,
        }
    }
}

/// Fan-out tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Seconds between liveness frames on each subscriber. 0 disables them.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// Per-subscriber queue depth. A subscriber whose queue is full is dropped.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl HubConfig {
    pub fn keepalive_interval(&self) -> Option<std::time::Duration> {
        (self.keepalive_secs > 0).then(|| std::time::Duration::from_secs(self.keepalive_secs))
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_keepalive_secs() -> u64 {
    KEEPALIVE_INTERVAL_SECS
}
fn default_subscriber_buffer() -> usize {
    SUBSCRIBER_BUFFER
}

impl RelayConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Later sources win:
    ///   1. built-in defaults
    ///   2. TOML file (explicit path, else ./sigrelay.toml; missing is fine)
    ///   3. `PORT` (set by most hosting platforms) → `gateway.port`
    ///   4. `SIGRELAY_*`, nested with `__` (e.g. `SIGRELAY_HUB__KEEPALIVE_SECS`)
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);

        let config: RelayConfig = Figment::from(Serialized::defaults(RelayConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::raw().only(&["PORT"]).map(|_| "gateway.port".into()))
            .merge(Env::prefixed("SIGRELAY_").split("__"))
            .extract()
            .map_err(|e| crate::error::RelayError::Config(e.to_string()))?;

        if config.hub.subscriber_buffer == 0 {
            return Err(crate::error::RelayError::Config(
                "hub.subscriber_buffer must be at least 1".to_string(),
            ));
        }

        if config.hub.keepalive_secs > MAX_KEEPALIVE_SECS {
            return Err(crate::error::RelayError::Config(format!(
                "hub.keepalive_secs must be at most {MAX_KEEPALIVE_SECS}"
            )));
        }

        Ok(config)
    }
}
