use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine distance.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both parts, or nothing. A lone latitude or longitude is not a position.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Self { lat, lng }),
            _ => None,
        }
    }
}

/// Great-circle distance between two points, in meters.
pub fn haversine_distance_m(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Circular area around a reference point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub center: Coordinates,
    pub radius_m: f64,
}

impl Geofence {
    pub const fn new(center: Coordinates, radius_m: f64) -> Self {
        Self { center, radius_m }
    }

    pub fn distance_to(&self, point: Coordinates) -> f64 {
        haversine_distance_m(point, self.center)
    }

    /// Inclusive: a point exactly on the boundary is inside.
    pub fn contains(&self, point: Coordinates) -> bool {
        self.distance_to(point) <= self.radius_m
    }
}
