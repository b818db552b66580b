//! Coordinator counters, recorded as events flow through the systems.

use bevy_ecs::prelude::Resource;

#[derive(Debug, Default, Resource)]
pub struct DispatchTelemetry {
    pub rides_requested: u64,
    pub dispatch_attempts: u64,
    pub offers_sent: u64,
    pub empty_pool_attempts: u64,
    pub response_timeouts: u64,
    pub rejections: u64,
    pub rides_accepted: u64,
    pub rides_cancelled: u64,
    pub request_expiries: u64,
    pub otp_issued: u64,
    pub otp_verified: u64,
    pub otp_failures: u64,
    pub otp_swept: u64,
    pub locations_relayed: u64,
    pub deliveries_dropped: u64,
}
