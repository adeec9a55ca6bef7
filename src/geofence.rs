//! Geofence containment tests.
//!
//! Polygons are tested with an even-odd ray cast over (lon, lat) treated as
//! planar coordinates, which is accurate enough for fences a few kilometres
//! across. Points lying on an edge count as inside. Circles use the
//! haversine great-circle distance.

use serde::{Deserialize, Serialize};

use crate::error::GeofenceError;

/// Mean Earth radius used by the haversine distance, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A geographic coordinate in degrees.
///
/// Serialized as a `[lon, lat]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    /// Create a point from longitude and latitude.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<[f64; 2]> for Point {
    fn from(pair: [f64; 2]) -> Self {
        Point::new(pair[0], pair[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.lon, point.lat]
    }
}

/// A geographic area used to gate requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeofenceSpec", into = "GeofenceSpec")]
pub enum Geofence {
    /// Closed polygon; a closing vertex equal to the first is optional
    Polygon(Vec<Point>),
    /// Circle around a center point
    Circle { center: Point, radius_meters: f64 },
}

impl Geofence {
    /// Build a validated polygon fence.
    pub fn polygon(vertices: Vec<Point>) -> Result<Self, GeofenceError> {
        if let Some(bad) = vertices.iter().find(|p| !p.is_valid()) {
            return Err(GeofenceError::InvalidCoordinate {
                lon: bad.lon,
                lat: bad.lat,
            });
        }

        let mut distinct: Vec<Point> = Vec::with_capacity(vertices.len());
        for vertex in open_ring(&vertices) {
            if !distinct.contains(vertex) {
                distinct.push(*vertex);
            }
        }
        if distinct.len() < 3 {
            return Err(GeofenceError::TooFewVertices(distinct.len()));
        }

        Ok(Geofence::Polygon(vertices))
    }

    /// Build a validated circular fence.
    pub fn circle(center: Point, radius_meters: f64) -> Result<Self, GeofenceError> {
        if !center.is_valid() {
            return Err(GeofenceError::InvalidCoordinate {
                lon: center.lon,
                lat: center.lat,
            });
        }
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(GeofenceError::InvalidRadius(radius_meters));
        }
        Ok(Geofence::Circle {
            center,
            radius_meters,
        })
    }

    /// Check whether a point lies inside this fence.
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Geofence::Polygon(vertices) => point_in_polygon(point, vertices),
            Geofence::Circle {
                center,
                radius_meters,
            } => haversine_meters(point, *center) <= *radius_meters,
        }
    }
}

/// Containment test over loosely specified fence parts.
///
/// A non-empty polygon takes precedence; otherwise a center and radius are
/// used; with neither, no point is contained.
pub fn contains(
    point: Point,
    polygon: Option<&[Point]>,
    center: Option<Point>,
    radius_meters: Option<f64>,
) -> bool {
    match (polygon, center, radius_meters) {
        (Some(vertices), _, _) if !vertices.is_empty() => point_in_polygon(point, vertices),
        (_, Some(center), Some(radius)) => haversine_meters(point, center) <= radius,
        _ => false,
    }
}

/// Great-circle distance between two points, in meters.
pub fn haversine_meters(a: Point, b: Point) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Even-odd point-in-polygon with inclusive edges.
fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    let ring = open_ring(vertices);
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let (x, y) = (point.lon, point.lat);
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].lon, ring[i].lat);
        let (xj, yj) = (ring[j].lon, ring[j].lat);

        if on_segment(x, y, xi, yi, xj, yj) {
            return true;
        }

        if (yi > y) != (yj > y) {
            let x_at_y = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < x_at_y {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn on_segment(x: f64, y: f64, xi: f64, yi: f64, xj: f64, yj: f64) -> bool {
    let cross = (x - xi) * (yj - yi) - (y - yi) * (xj - xi);
    cross == 0.0
        && xi.min(xj) <= x
        && x <= xi.max(xj)
        && yi.min(yj) <= y
        && y <= yi.max(yj)
}

/// Drop a closing vertex that repeats the first one.
fn open_ring(vertices: &[Point]) -> &[Point] {
    match (vertices.first(), vertices.last()) {
        (Some(first), Some(last)) if vertices.len() >= 2 && first == last => {
            &vertices[..vertices.len() - 1]
        }
        _ => vertices,
    }
}

/// Wire form of a geofence: exactly one of `polygon` or `center` +
/// `radius_meters`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GeofenceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    polygon: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    center: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    radius_meters: Option<f64>,
}

impl TryFrom<GeofenceSpec> for Geofence {
    type Error = GeofenceError;

    fn try_from(spec: GeofenceSpec) -> Result<Self, Self::Error> {
        match (spec.polygon, spec.center, spec.radius_meters) {
            (Some(vertices), None, None) => Geofence::polygon(vertices),
            (None, Some(center), Some(radius)) => Geofence::circle(center, radius),
            _ => Err(GeofenceError::Ambiguous),
        }
    }
}

impl From<Geofence> for GeofenceSpec {
    fn from(fence: Geofence) -> Self {
        match fence {
            Geofence::Polygon(vertices) => GeofenceSpec {
                polygon: Some(vertices),
                ..Default::default()
            },
            Geofence::Circle {
                center,
                radius_meters,
            } => GeofenceSpec {
                polygon: None,
                center: Some(center),
                radius_meters: Some(radius_meters),
            },
        }
    }
}
