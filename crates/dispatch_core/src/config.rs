//! Engine tuning knobs.

use bevy_ecs::prelude::Resource;

/// Default maximum driver-to-pickup distance for matching.
const DEFAULT_MATCH_RADIUS_KM: f64 = 8.0;
/// Default driver response window.
const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 30 * 1000;
/// Default overall bound on an unmatched ride request.
const DEFAULT_REQUEST_EXPIRY_MS: u64 = 60 * 1000;
/// Default post-accept cancellation window.
const DEFAULT_CANCEL_WINDOW_MS: u64 = 10 * 1000;
/// Default OTP sweep cadence and record lifetime.
const DEFAULT_OTP_SWEEP_INTERVAL_MS: u64 = 5 * 60 * 1000;
const DEFAULT_OTP_TTL_MS: u64 = 30 * 60 * 1000;

#[derive(Debug, Clone, Resource)]
pub struct EngineConfig {
    pub match_radius_km: f64,
    pub response_timeout_ms: u64,
    pub request_expiry_ms: u64,
    pub cancel_window_ms: u64,
    pub otp_sweep_interval_ms: u64,
    pub otp_ttl_ms: u64,
    /// RNG seed for OTP codes (None = entropy).
    pub otp_seed: Option<u64>,
    pub grid_disk_cache_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_radius_km: DEFAULT_MATCH_RADIUS_KM,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            request_expiry_ms: DEFAULT_REQUEST_EXPIRY_MS,
            cancel_window_ms: DEFAULT_CANCEL_WINDOW_MS,
            otp_sweep_interval_ms: DEFAULT_OTP_SWEEP_INTERVAL_MS,
            otp_ttl_ms: DEFAULT_OTP_TTL_MS,
            otp_seed: None,
            grid_disk_cache_size: 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_match_radius_km(mut self, radius_km: f64) -> Self {
        self.match_radius_km = radius_km;
        self
    }

    pub fn with_response_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.response_timeout_ms = timeout_ms;
        self
    }

    pub fn with_request_expiry_ms(mut self, expiry_ms: u64) -> Self {
        self.request_expiry_ms = expiry_ms;
        self
    }

    pub fn with_cancel_window_ms(mut self, window_ms: u64) -> Self {
        self.cancel_window_ms = window_ms;
        self
    }

    pub fn with_otp_seed(mut self, seed: u64) -> Self {
        self.otp_seed = Some(seed);
        self
    }
}
