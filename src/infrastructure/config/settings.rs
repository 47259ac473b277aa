use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::activity::CursorPolicy;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Shared key required in `X-API-Key` for `/api/v1/*`. Unset means open.
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
    /// Create the `activities` table on startup if it is missing
    #[serde(default = "default_true")]
    pub apply_schema: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// "postgres" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Polling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub cursor_policy: CursorPolicy,
    /// Maximum rows fetched per tick (only honored by the `max_seen` policy)
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Outbound frames buffered per connection before sends start failing
    #[serde(default = "default_send_buffer")]
    pub send_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_database_url() -> String {
    "postgres://localhost:5432/vendcrm".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    300
}

fn default_true() -> bool {
    true
}

fn default_store_backend() -> String {
    "postgres".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_batch_limit() -> usize {
    500
}

fn default_send_buffer() -> usize {
    64
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "vendcrm-activity-relay".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

/// Keys whose names contain `_`. The `_`-separated env source splits these into
/// nested paths, so they are read from their env var explicitly.
const UNDERSCORE_KEYS: &[(&str, &str)] = &[
    ("DATABASE_POOL_SIZE", "database.pool_size"),
    ("DATABASE_CONNECT_TIMEOUT_SECONDS", "database.connect_timeout_seconds"),
    ("DATABASE_IDLE_TIMEOUT_SECONDS", "database.idle_timeout_seconds"),
    ("DATABASE_APPLY_SCHEMA", "database.apply_schema"),
    ("RELAY_POLL_INTERVAL_MS", "relay.poll_interval_ms"),
    ("RELAY_CURSOR_POLICY", "relay.cursor_policy"),
    ("RELAY_BATCH_LIMIT", "relay.batch_limit"),
    ("WEBSOCKET_SEND_BUFFER", "websocket.send_buffer"),
    ("TELEMETRY_LOG_FORMAT", "telemetry.log_format"),
    ("OTEL_SERVICE_NAME", "otel.service_name"),
    ("OTEL_SAMPLING_RATIO", "otel.sampling_ratio"),
];

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("relay.poll_interval_ms", 5000)?
            .set_default("relay.cursor_policy", "max_seen")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER_PORT, DATABASE_URL, API_KEY, OTEL_ENABLED, ...
            .add_source(Environment::default().separator("_").try_parsing(true));

        apply_env_overrides(builder, |var| env::var(var).ok())?
            .build()?
            .try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Override underscore keys and `server.cors_origins` (comma separated) from `lookup`.
/// Unset and blank variables leave the layered value alone.
fn apply_env_overrides<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    for (var, key) in UNDERSCORE_KEYS {
        builder = builder.set_override_option(*key, lookup(*var))?;
    }

    if let Some(origins) = lookup("SERVER_CORS_ORIGINS") {
        let origins: Vec<String> = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
        builder = builder.set_override("server.cors_origins", origins)?;
    }

    Ok(builder)
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
            apply_schema: true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            cursor_policy: CursorPolicy::default(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            send_buffer: default_send_buffer(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8081);

        let relay = RelayConfig::default();
        assert_eq!(relay.poll_interval(), Duration::from_millis(5000));
        assert_eq!(relay.cursor_policy, CursorPolicy::MaxSeen);
        assert_eq!(relay.batch_limit, 500);

        assert_eq!(WebSocketConfig::default().send_buffer, 64);
        assert_eq!(StoreConfig::default().backend, "postgres");
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let relay = RelayConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(relay.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let raw = r#"
            [server]
            port = 9000

            [store]
            backend = "memory"

            [relay]
            poll_interval_ms = 250
            cursor_policy = "now"
        "#;

        let settings: Settings = Config::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.store.backend, "memory");
        assert_eq!(settings.relay.poll_interval_ms, 250);
        assert_eq!(settings.relay.cursor_policy, CursorPolicy::Now);
        assert!(settings.api.key.is_none());
        assert!(!settings.otel.enabled);
    }

    #[test]
    fn test_underscore_keys_overridden_from_env_lookup() {
        let vars: std::collections::HashMap<&str, &str> = [
            ("RELAY_POLL_INTERVAL_MS", "250"),
            ("RELAY_CURSOR_POLICY", "now"),
            ("RELAY_BATCH_LIMIT", "20"),
            ("WEBSOCKET_SEND_BUFFER", "8"),
            ("DATABASE_POOL_SIZE", "12"),
            ("TELEMETRY_LOG_FORMAT", "json"),
            ("OTEL_SERVICE_NAME", "relay-staging"),
            ("OTEL_SAMPLING_RATIO", "0.5"),
            ("SERVER_CORS_ORIGINS", "https://crm.example.com, https://ops.example.com"),
            // Blank values are ignored
            ("DATABASE_IDLE_TIMEOUT_SECONDS", " "),
        ]
        .into_iter()
        .collect();

        let builder = Config::builder()
            .add_source(File::from_str("[server]\nport = 9000\n", config::FileFormat::Toml));
        let settings: Settings = apply_env_overrides(builder, |var| {
            vars.get(var).map(|v| v.to_string())
        })
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

        assert_eq!(settings.relay.poll_interval_ms, 250);
        assert_eq!(settings.relay.cursor_policy, CursorPolicy::Now);
        assert_eq!(settings.relay.batch_limit, 20);
        assert_eq!(settings.websocket.send_buffer, 8);
        assert_eq!(settings.database.pool_size, 12);
        assert_eq!(settings.database.idle_timeout_seconds, 300);
        assert_eq!(settings.telemetry.log_format, "json");
        assert_eq!(settings.otel.service_name, "relay-staging");
        assert_eq!(settings.otel.sampling_ratio, 0.5);
        assert_eq!(
            settings.server.cors_origins,
            vec!["https://crm.example.com", "https://ops.example.com"]
        );
        assert_eq!(settings.server.port, 9000);
    }

    #[test]
    fn test_poll_interval_from_process_env() {
        std::env::set_var("RELAY_POLL_INTERVAL_MS", "250");
        let settings = Settings::new();
        std::env::remove_var("RELAY_POLL_INTERVAL_MS");

        let settings = settings.unwrap();
        assert_eq!(settings.relay.poll_interval_ms, 250);
        assert_eq!(settings.relay.poll_interval(), Duration::from_millis(250));
    }
}
