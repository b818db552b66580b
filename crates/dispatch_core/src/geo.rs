//! Geographic primitives: coordinate validation, haversine distance, and the
//! H3 cell index used to prefilter drivers near a pickup point.
//!
//! Positions are kept as raw lat/lng degrees (the wire format) and mapped to
//! resolution-7 cells (~2 km spacing) for the presence index. Radius queries
//! take a cached grid disk around the pickup cell and exact-filter with the
//! haversine distance.

use std::num::NonZeroUsize;

use bevy_ecs::prelude::Resource;
use h3o::{CellIndex, LatLng, Resolution};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::errors::GeoError;

/// Resolution of the driver presence index.
pub const PRESENCE_RESOLUTION: Resolution = Resolution::Seven;

/// Conservative lower bound on res-7 cell center spacing, so disks computed
/// from it always over-cover the requested radius.
const RES7_CELL_SPACING_KM: f64 = 1.8;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 point in degrees. `lng` is canonical; any `lon` spelling is
/// normalized away at the wire boundary before a point is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn validated(self) -> Result<Self, GeoError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(GeoError::InvalidLocation {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }

    /// The presence-index cell containing this point.
    pub fn cell(&self) -> Result<CellIndex, GeoError> {
        let coord = LatLng::new(self.lat, self.lng).map_err(|_| GeoError::InvalidLocation {
            lat: self.lat,
            lng: self.lng,
        })?;
        Ok(coord.to_cell(PRESENCE_RESOLUTION))
    }
}

/// Great-circle distance in kilometers. Fails if either point carries
/// non-finite or out-of-range coordinates.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> Result<f64, GeoError> {
    let a = a.validated()?;
    let b = b.validated()?;
    Ok(haversine_km(a, b))
}

/// Haversine on pre-validated points.
pub(crate) fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Grid-disk k covering `radius_km` around a res-7 cell, with one extra ring
/// so the over-cover holds at cell boundaries.
pub fn disk_radius_for_km(radius_km: f64) -> u32 {
    (radius_km / RES7_CELL_SPACING_KM).ceil() as u32 + 1
}

/// Cached grid disks keyed by (origin, k). Pickup cells repeat across the
/// re-dispatch loop of a single ride, so hits are common.
#[derive(Resource)]
pub struct GridDiskCache {
    cache: LruCache<(CellIndex, u32), Vec<CellIndex>>,
}

impl GridDiskCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn disk(&mut self, origin: CellIndex, k: u32) -> Vec<CellIndex> {
        self.cache
            .get_or_insert((origin, k), || origin.grid_disk::<Vec<_>>(k))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoPoint::new(28.60, 77.20);
        assert_eq!(distance_km(p, p).expect("valid"), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(28.60, 77.20);
        let b = GeoPoint::new(28.61, 77.21);
        let ab = distance_km(a, b).expect("valid");
        let ba = distance_km(b, a).expect("valid");
        assert!((ab - ba).abs() < 1e-12);
        assert!(ab > 0.0);
    }

    #[test]
    fn nearby_points_are_within_radius() {
        // ~1.5 km apart; must pass an 8 km eligibility filter.
        let a = GeoPoint::new(28.60, 77.20);
        let b = GeoPoint::new(28.61, 77.21);
        let d = distance_km(a, b).expect("valid");
        assert!(d < 8.0, "expected < 8 km, got {d}");
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let bad = GeoPoint::new(91.0, 0.0);
        assert!(distance_km(bad, GeoPoint::new(0.0, 0.0)).is_err());
        assert!(GeoPoint::new(0.0, 181.0).validated().is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).validated().is_err());
    }

    #[test]
    fn disk_covers_eight_km() {
        let origin = GeoPoint::new(28.60, 77.20);
        let target = GeoPoint::new(28.66, 77.20); // ~6.7 km north
        let k = disk_radius_for_km(8.0);
        let mut cache = GridDiskCache::new(16);
        let disk = cache.disk(origin.cell().expect("cell"), k);
        assert!(disk.contains(&target.cell().expect("cell")));
    }
}
