//! Gateway settings, loaded from `DISPATCH_*` environment variables.

use dispatch_core::config::EngineConfig;
use serde::Deserialize;

use crate::error::GatewayError;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How often the engine's timers are driven, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_match_radius_km")]
    pub match_radius_km: f64,
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
    #[serde(default = "default_request_expiry_secs")]
    pub request_expiry_secs: u64,
    #[serde(default = "default_cancel_window_secs")]
    pub cancel_window_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7080
}

fn default_tick_interval_ms() -> u64 {
    250
}

fn default_match_radius_km() -> f64 {
    8.0
}

fn default_response_timeout_secs() -> u64 {
    30
}

fn default_request_expiry_secs() -> u64 {
    60
}

fn default_cancel_window_secs() -> u64 {
    10
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            match_radius_km: default_match_radius_km(),
            response_timeout_secs: default_response_timeout_secs(),
            request_expiry_secs: default_request_expiry_secs(),
            cancel_window_secs: default_cancel_window_secs(),
        }
    }
}

impl Settings {
    /// Load from the environment: `DISPATCH_SERVER__PORT=9000`,
    /// `DISPATCH_ENGINE__MATCH_RADIUS_KM=5`, and so on.
    pub fn load() -> Result<Self, GatewayError> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::Environment::with_prefix("DISPATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(GatewayError::Config)?;
        settings.try_deserialize().map_err(GatewayError::Config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_match_radius_km(self.engine.match_radius_km)
            .with_response_timeout_ms(self.engine.response_timeout_secs * 1000)
            .with_request_expiry_ms(self.engine.request_expiry_secs * 1000)
            .with_cancel_window_ms(self.engine.cancel_window_secs * 1000)
    }
}
