//! Geographic primitives
//!
//! Coordinates are WGS84 degrees. Distances are meters on a spherical earth,
//! which is precise enough for collect and talk radii of a few dozen meters.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Attempts made by [`Polygon::random_point`] before giving up
pub const MAX_SAMPLE_ATTEMPTS: usize = 1000;

/// A position on the map
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    /// Create a validated position
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GameError> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(GameError::InvalidLocation {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Create a position without validation (for constants)
    pub const fn raw(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another position in meters
    pub fn distance_to(&self, other: &LatLon) -> f64 {
        distance_m(self, other)
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Haversine distance between two positions in meters
pub fn distance_m(a: &LatLon, b: &LatLon) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Axis-aligned box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Box enclosing a circle of `radius_m` around `center`
    pub fn around(center: &LatLon, radius_m: f64) -> Self {
        let dlat = (radius_m / EARTH_RADIUS_M).to_degrees();
        // Longitude degrees shrink towards the poles; clamp to avoid division by zero
        let cos_lat = center.latitude.to_radians().cos().max(1e-6);
        let dlon = (radius_m / (EARTH_RADIUS_M * cos_lat)).to_degrees();

        Self {
            south: (center.latitude - dlat).max(-90.0),
            west: (center.longitude - dlon).max(-180.0),
            north: (center.latitude + dlat).min(90.0),
            east: (center.longitude + dlon).min(180.0),
        }
    }

    /// Check whether a position lies inside (edges inclusive)
    pub fn contains(&self, point: &LatLon) -> bool {
        point.latitude >= self.south
            && point.latitude <= self.north
            && point.longitude >= self.west
            && point.longitude <= self.east
    }

    /// Check whether another box lies completely inside this one
    pub fn covers(&self, other: &BoundingBox) -> bool {
        other.south >= self.south
            && other.north <= self.north
            && other.west >= self.west
            && other.east <= self.east
    }

    /// Center of the box
    pub fn center(&self) -> LatLon {
        LatLon::raw(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}]",
            self.south, self.west, self.north, self.east
        )
    }
}

/// Simple polygon given by its outline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<LatLon>,
}

impl Polygon {
    pub fn new(points: Vec<LatLon>) -> Self {
        Self { points }
    }

    /// Build from (latitude, longitude) pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self {
            points: pairs
                .iter()
                .map(|&(lat, lon)| LatLon::raw(lat, lon))
                .collect(),
        }
    }

    /// Even-odd containment test
    pub fn contains(&self, point: &LatLon) -> bool {
        if self.points.len() < 3 {
            return false;
        }

        let (x, y) = (point.longitude, point.latitude);
        let mut inside = false;
        let mut j = self.points.len() - 1;

        for i in 0..self.points.len() {
            let (xi, yi) = (self.points[i].longitude, self.points[i].latitude);
            let (xj, yj) = (self.points[j].longitude, self.points[j].latitude);

            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Smallest box containing all points
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let mut bbox = BoundingBox::new(
            first.latitude,
            first.longitude,
            first.latitude,
            first.longitude,
        );
        for p in &self.points[1..] {
            bbox.south = bbox.south.min(p.latitude);
            bbox.north = bbox.north.max(p.latitude);
            bbox.west = bbox.west.min(p.longitude);
            bbox.east = bbox.east.max(p.longitude);
        }
        Some(bbox)
    }

    /// Uniformly sample a point inside the polygon
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<LatLon> {
        let bbox = self.bounding_box()?;
        if bbox.south >= bbox.north || bbox.west >= bbox.east {
            return None;
        }

        (0..MAX_SAMPLE_ATTEMPTS)
            .map(|_| {
                LatLon::raw(
                    rng.gen_range(bbox.south..bbox.north),
                    rng.gen_range(bbox.west..bbox.east),
                )
            })
            .find(|candidate| self.contains(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn square() -> Polygon {
        Polygon::from_pairs(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)])
    }

    #[test]
    fn test_latlon_validation() {
        assert!(LatLon::new(50.7, 7.1).is_ok());
        assert!(LatLon::new(90.0, 180.0).is_ok());
        assert!(LatLon::new(90.1, 0.0).is_err());
        assert!(LatLon::new(0.0, -180.5).is_err());
        assert!(LatLon::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_known_values() {
        let a = LatLon::raw(0.0, 0.0);
        assert_eq!(distance_m(&a, &a), 0.0);

        // One degree of latitude is roughly 111.2 km
        let b = LatLon::raw(1.0, 0.0);
        let d = distance_m(&a, &b);
        assert!((d - 111_195.0).abs() < 10.0, "got {}", d);

        // Symmetric
        assert!((distance_m(&b, &a) - d).abs() < 1e-6);
    }

    #[test]
    fn test_bbox_around_contains_circle() {
        let center = LatLon::raw(50.0, 7.0);
        let bbox = BoundingBox::around(&center, 1000.0);
        assert!(bbox.contains(&center));

        let north = LatLon::raw(50.0 + 0.0089, 7.0);
        assert!(bbox.contains(&north));
        let far = LatLon::raw(50.02, 7.0);
        assert!(!bbox.contains(&far));
    }

    #[test]
    fn test_bbox_covers() {
        let outer = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let inner = BoundingBox::new(0.5, 0.5, 1.5, 1.5);
        assert!(outer.covers(&inner));
        assert!(!inner.covers(&outer));
    }

    #[test]
    fn test_polygon_contains() {
        let poly = square();
        assert!(poly.contains(&LatLon::raw(0.5, 0.5)));
        assert!(!poly.contains(&LatLon::raw(1.5, 0.5)));
        assert!(!poly.contains(&LatLon::raw(-0.1, 0.5)));
    }

    #[test]
    fn test_polygon_concave() {
        // U shape, the notch is outside
        let poly = Polygon::from_pairs(&[
            (0.0, 0.0),
            (0.0, 3.0),
            (3.0, 3.0),
            (3.0, 2.0),
            (1.0, 2.0),
            (1.0, 1.0),
            (3.0, 1.0),
            (3.0, 0.0),
        ]);
        assert!(poly.contains(&LatLon::raw(0.5, 1.5)));
        assert!(!poly.contains(&LatLon::raw(2.0, 1.5)));
        assert!(poly.contains(&LatLon::raw(2.0, 0.5)));
    }

    #[test]
    fn test_degenerate_polygon() {
        let line = Polygon::from_pairs(&[(0.0, 0.0), (1.0, 1.0)]);
        assert!(!line.contains(&LatLon::raw(0.5, 0.5)));

        let mut rng = StdRng::seed_from_u64(7);
        assert!(line.random_point(&mut rng).is_none());
        assert!(Polygon::default().random_point(&mut rng).is_none());
    }

    #[test]
    fn test_random_point_inside() {
        let poly = square();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let p = poly.random_point(&mut rng).unwrap();
            assert!(poly.contains(&p));
        }
    }
}
