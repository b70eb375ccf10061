use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latitude limit of the Web Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Deepest zoom slippy-map tile servers publish.
pub const MAX_TILE_ZOOM: u8 = 22;

const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Project onto the unit Web Mercator square (x east, y south, both 0..1).
    pub fn to_world(self) -> WorldPoint {
        let lat = self.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let x = (self.lng + 180.0) / 360.0;
        let lat_rad = lat.to_radians();
        let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0;
        WorldPoint { x, y }
    }

    /// Great-circle distance in meters.
    pub fn distance_to(self, other: LatLng) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let dphi = (other.lat - self.lat).to_radians();
        let dlambda = (other.lng - self.lng).to_radians();
        let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// One successful geolocation reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub position: LatLng,
    pub accuracy_m: f64,
    pub acquired_at: DateTime<Utc>,
}

impl GeoFix {
    /// Build from the raw fields of a `GeolocationPosition` (timestamp in epoch ms).
    pub fn from_reading(lat: f64, lng: f64, accuracy_m: f64, timestamp_ms: f64) -> Self {
        let acquired_at =
            DateTime::from_timestamp_millis(timestamp_ms as i64).unwrap_or(DateTime::UNIX_EPOCH);
        Self {
            position: LatLng { lat, lng },
            accuracy_m,
            acquired_at,
        }
    }
}

/// A point on the unit Web Mercator square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub fn to_lat_lng(self) -> LatLng {
        let lng = self.x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * self.y)).sinh().atan().to_degrees();
        LatLng { lat, lng }
    }
}

/// Axis-aligned geographic bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Smallest bounds containing every point, or `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LatLng>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self {
            south_west: first,
            north_east: first,
        };
        for p in iter {
            bounds.extend(*p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }
}

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    /// Tile containing `point` at zoom `z`.
    pub fn containing(point: WorldPoint, z: u8) -> Self {
        let n = tiles_per_side(z);
        let max = (n - 1) as f64;
        let x = (point.x * n as f64).floor().clamp(0.0, max) as u32;
        let y = (point.y * n as f64).floor().clamp(0.0, max) as u32;
        Self { x, y, z }
    }

    /// North-west corner of the tile on the unit square.
    pub fn origin(&self) -> WorldPoint {
        let n = tiles_per_side(self.z) as f64;
        WorldPoint {
            x: self.x as f64 / n,
            y: self.y as f64 / n,
        }
    }

    /// Fill a `{s}/{z}/{x}/{y}` URL template. The subdomain rotates with the
    /// tile address so neighbouring tiles spread across hosts.
    pub fn url(&self, template: &str, subdomains: &str) -> String {
        let mut url = template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string());
        let subs: Vec<char> = subdomains.chars().collect();
        if !subs.is_empty() {
            let idx = (self.x as usize + self.y as usize) % subs.len();
            url = url.replace("{s}", &subs[idx].to_string());
        }
        url
    }
}

pub fn tiles_per_side(z: u8) -> u32 {
    1u32 << z.min(31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < tolerance,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn equator_prime_meridian_is_center() {
        let p = LatLng::new(0.0, 0.0).to_world();
        assert_close(p.x, 0.5, 1e-12);
        assert_close(p.y, 0.5, 1e-12);
    }

    #[test]
    fn projection_inverts() {
        let campus = LatLng::new(12.860478, 77.438711);
        let back = campus.to_world().to_lat_lng();
        assert_close(back.lat, campus.lat, 1e-9);
        assert_close(back.lng, campus.lng, 1e-9);
    }

    #[test]
    fn polar_latitudes_are_clamped() {
        let p = LatLng::new(90.0, 0.0).to_world();
        assert_close(p.y, 0.0, 1e-6);
    }

    #[test]
    fn london_tile_at_zoom_10() {
        let tile = TileCoord::containing(LatLng::new(51.5074, -0.1278).to_world(), 10);
        assert_eq!(tile, TileCoord { x: 511, y: 340, z: 10 });
    }

    #[test]
    fn tile_origin_is_north_west_corner() {
        let tile = TileCoord { x: 1, y: 1, z: 1 };
        let origin = tile.origin();
        assert_close(origin.x, 0.5, 1e-12);
        assert_close(origin.y, 0.5, 1e-12);
    }

    #[test]
    fn tile_url_rotates_subdomains() {
        let template = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
        let a = TileCoord { x: 0, y: 0, z: 3 }.url(template, "abc");
        let b = TileCoord { x: 1, y: 0, z: 3 }.url(template, "abc");
        assert_eq!(a, "https://a.tile.openstreetmap.org/3/0/0.png");
        assert_eq!(b, "https://b.tile.openstreetmap.org/3/1/0.png");
    }

    #[test]
    fn tile_url_without_subdomains_keeps_placeholder_free_template() {
        let url = TileCoord { x: 5, y: 6, z: 7 }.url("/tiles/{z}/{x}/{y}.png", "");
        assert_eq!(url, "/tiles/7/5/6.png");
    }

    #[test]
    fn distance_between_campus_blocks() {
        let a = LatLng::new(12.860478, 77.438711);
        let b = LatLng::new(12.860448, 77.439469);
        // ~82 m apart along the same parallel
        assert_close(a.distance_to(b), 82.2, 1.0);
    }

    #[test]
    fn fix_from_reading_keeps_timestamp() {
        let fix = GeoFix::from_reading(12.86, 77.44, 15.0, 1_700_000_000_123.0);
        assert_eq!(fix.position, LatLng::new(12.86, 77.44));
        assert_eq!(fix.accuracy_m, 15.0);
        assert_eq!(fix.acquired_at.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn bounds_cover_all_points() {
        let pts = [
            LatLng::new(1.0, 4.0),
            LatLng::new(-2.0, 6.0),
            LatLng::new(3.0, 5.0),
        ];
        let bounds = LatLngBounds::from_points(&pts).unwrap();
        assert_eq!(bounds.south_west, LatLng::new(-2.0, 4.0));
        assert_eq!(bounds.north_east, LatLng::new(3.0, 6.0));
        assert!(LatLngBounds::from_points(&[]).is_none());
    }
}
