pub mod clock;
pub mod commands;
pub mod config;
#[cfg(feature = "directory")]
pub mod directory;
pub mod engine;
pub mod errors;
pub mod events;
pub mod geo;
pub mod matching;
pub mod otp;
pub mod outbox;
pub mod parties;
pub mod presence;
pub mod rides;
pub mod systems;
pub mod telemetry;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
