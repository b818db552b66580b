//! OTP handshake records and code generation.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::parties::{DriverId, RideId, RiderId};

#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub code: String,
    pub generated_at_ms: u64,
    pub verified: bool,
    pub rider: RiderId,
    pub driver: DriverId,
}

/// OTP records keyed by ride. Re-requests overwrite; the periodic sweep is
/// the only collector.
#[derive(Debug, Default, Resource)]
pub struct OtpStore {
    by_ride: HashMap<RideId, OtpRecord>,
}

impl OtpStore {
    pub fn upsert(&mut self, ride_id: RideId, record: OtpRecord) {
        self.by_ride.insert(ride_id, record);
    }

    pub fn get(&self, ride_id: &RideId) -> Option<&OtpRecord> {
        self.by_ride.get(ride_id)
    }

    pub fn get_mut(&mut self, ride_id: &RideId) -> Option<&mut OtpRecord> {
        self.by_ride.get_mut(ride_id)
    }

    /// Drop records older than `ttl_ms` regardless of verification state.
    pub fn sweep(&mut self, now_ms: u64, ttl_ms: u64) -> usize {
        let before = self.by_ride.len();
        self.by_ride
            .retain(|_, record| now_ms.saturating_sub(record.generated_at_ms) < ttl_ms);
        before - self.by_ride.len()
    }

    pub fn len(&self) -> usize {
        self.by_ride.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ride.is_empty()
    }
}

/// 6-digit code source. Seedable for reproducible tests, entropy-seeded in
/// production.
#[derive(Debug, Resource)]
pub struct OtpGenerator {
    rng: StdRng,
}

impl OtpGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn next_code(&mut self) -> String {
        self.rng.gen_range(100_000..=999_999).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        let mut generator = OtpGenerator::new(Some(7));
        for _ in 0..100 {
            let code = generator.next_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn same_seed_yields_same_codes() {
        let mut a = OtpGenerator::new(Some(42));
        let mut b = OtpGenerator::new(Some(42));
        assert_eq!(a.next_code(), b.next_code());
    }

    #[test]
    fn sweep_drops_only_stale_records() {
        let mut store = OtpStore::default();
        let fresh = RideId::generate();
        let stale = RideId::generate();
        store.upsert(
            fresh,
            OtpRecord {
                code: "123456".into(),
                generated_at_ms: 25 * 60 * 1000,
                verified: false,
                rider: RiderId("r".into()),
                driver: DriverId("d".into()),
            },
        );
        store.upsert(
            stale,
            OtpRecord {
                code: "654321".into(),
                generated_at_ms: 0,
                verified: true,
                rider: RiderId("r".into()),
                driver: DriverId("d".into()),
            },
        );

        let removed = store.sweep(31 * 60 * 1000, 30 * 60 * 1000);
        assert_eq!(removed, 1);
        assert!(store.get(&fresh).is_some());
        assert!(store.get(&stale).is_none(), "verified records are swept too");
    }
}
