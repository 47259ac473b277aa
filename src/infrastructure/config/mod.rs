mod settings;

pub use settings::{
    ApiConfig, DatabaseConfig, OtelConfig, RelayConfig, ServerConfig, Settings, StoreConfig,
    TelemetryConfig, WebSocketConfig,
};
