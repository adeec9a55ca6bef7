//! Error types for sitegate.

use std::time::Duration;

use thiserror::Error;

/// Error type for sitegate operations.
///
/// Nothing on the per-request decision path returns this to the caller;
/// evaluators degrade to "no verdict" instead. These errors surface at
/// construction time (config, sites file, cache) and from the geo resolver.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid IP address
    #[error("invalid IP address: {0}")]
    InvalidIpAddress(String),

    /// No data source could answer a geo lookup
    #[error("geo provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// GeoIP database error
    #[error("GeoIP error: {0}")]
    GeoIp(String),
}

/// Result type alias for sitegate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for IP rule parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpRuleError {
    /// Invalid CIDR notation
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),

    /// Action is neither allow nor deny
    #[error("unrecognized rule action: {0}")]
    InvalidAction(String),
}

/// Error type for geofence construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeofenceError {
    /// Polygon has fewer than three distinct vertices
    #[error("polygon needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),

    /// Radius is zero, negative or not finite
    #[error("radius must be a positive number of meters, got {0}")]
    InvalidRadius(f64),

    /// Coordinate outside lon [-180, 180] / lat [-90, 90]
    #[error("coordinate out of range: ({lon}, {lat})")]
    InvalidCoordinate { lon: f64, lat: f64 },

    /// Both or neither of polygon and center/radius were given
    #[error("geofence must define either a polygon or a center and radius")]
    Ambiguous,
}

/// Error type for external geo-data providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider cannot serve lookups
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Lookup did not finish in time
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Error type for the persistent geo cache.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend failure
    #[error("persistent cache error: {0}")]
    Backend(String),

    /// Call did not finish in time
    #[error("persistent cache timed out after {0:?}")]
    Timeout(Duration),
}

/// Error type for artifact capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Capture backend failure
    #[error("artifact capture failed: {0}")]
    Failed(String),
}
