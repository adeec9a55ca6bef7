//! Geo-location resolution for client addresses.
//!
//! Lookups go through three layers, each consulted only on a miss in the
//! previous one:
//!
//! 1. an in-memory [`TtlCache`] shared by all requests,
//! 2. an optional [`PersistentGeoCache`] (a database table, a KV store, ...),
//! 3. a [`GeoProvider`] such as [`MaxMindProvider`].

mod cache;
mod maxmind;
mod resolver;

pub use cache::{CacheEntry, Clock, ManualClock, SystemClock, TtlCache};
pub use maxmind::MaxMindProvider;
pub use resolver::{GeoResolver, DEFAULT_PROVIDER_TIMEOUT, DEFAULT_STORE_TIMEOUT};

use std::net::IpAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProviderError, StoreError};
use crate::geofence::Point;

/// Location data for one IP address.
///
/// Any field may be missing: a provider that knows the country but not the
/// coordinates still yields a usable record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Provider payload as received
    #[serde(default)]
    pub raw: Map<String, Value>,
}

impl GeoLocation {
    /// Normalize a provider payload.
    ///
    /// Accepts both flat payloads (`country_code`, `latitude`, `longitude`)
    /// and MaxMind-shaped ones (`country.iso_code`, `location.latitude`,
    /// `location.longitude`). Coordinates are kept only when both are present.
    pub fn from_raw(raw: Value) -> Self {
        let raw = match raw {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let country_code = raw
            .get("country_code")
            .and_then(Value::as_str)
            .or_else(|| {
                raw.get("country")
                    .and_then(|c| c.get("iso_code"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string);

        let coordinate = |key: &str| {
            raw.get(key).and_then(Value::as_f64).or_else(|| {
                raw.get("location")
                    .and_then(|l| l.get(key))
                    .and_then(Value::as_f64)
            })
        };
        let (latitude, longitude) = match (coordinate("latitude"), coordinate("longitude")) {
            (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
            _ => (None, None),
        };

        Self {
            country_code,
            latitude,
            longitude,
            raw,
        }
    }

    /// The location as a point, if coordinates are known.
    pub fn point(&self) -> Option<Point> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some(Point::new(lon, lat)),
            _ => None,
        }
    }
}

/// External source of raw location payloads.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Look up an address; the payload is normalized by the resolver.
    async fn lookup(&self, ip: IpAddr) -> Result<Value, ProviderError>;
}

/// Persistent second-level cache keyed by IP string.
#[async_trait]
pub trait PersistentGeoCache: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<Option<GeoLocation>, StoreError>;

    async fn store(&self, ip: &str, location: &GeoLocation) -> Result<(), StoreError>;
}
