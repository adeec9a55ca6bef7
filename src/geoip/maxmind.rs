//! MaxMind database provider.

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use maxminddb::{MaxMindDBError, Reader};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::GeoProvider;
use crate::error::{Error, ProviderError, Result};

#[derive(Deserialize)]
struct Country {
    iso_code: Option<String>,
}

#[derive(Deserialize)]
struct Location {
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy_radius: Option<u16>,
    time_zone: Option<String>,
}

#[derive(Deserialize)]
struct CityResponse {
    country: Option<Country>,
    location: Option<Location>,
}

/// Geo provider backed by a GeoLite2/GeoIP2 City or Country database.
///
/// Country databases carry no coordinates; lookups then yield a record
/// with only the country code.
#[derive(Clone)]
pub struct MaxMindProvider {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindProvider {
    /// Open a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = Reader::open_readfile(path).map_err(|e| Error::GeoIp(e.to_string()))?;
        log::info!(
            "Loaded GeoIP database {:?} ({})",
            path,
            reader.metadata.database_type
        );
        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    /// Load a database from bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let reader = Reader::from_source(data).map_err(|e| Error::GeoIp(e.to_string()))?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    fn lookup_sync(&self, ip: IpAddr) -> std::result::Result<Value, ProviderError> {
        let response: CityResponse = match self.reader.lookup(ip) {
            Ok(response) => response,
            // Unknown address: an empty record, not an outage
            Err(MaxMindDBError::AddressNotFoundError(_)) => return Ok(Value::Object(Map::new())),
            Err(e) => return Err(ProviderError::Unavailable(e.to_string())),
        };
        Ok(to_payload(response))
    }
}

fn to_payload(response: CityResponse) -> Value {
    let mut payload = Map::new();
    if let Some(code) = response.country.and_then(|c| c.iso_code) {
        payload.insert("country".to_string(), json!({ "iso_code": code }));
    }
    if let Some(location) = response.location {
        payload.insert(
            "location".to_string(),
            json!({
                "latitude": location.latitude,
                "longitude": location.longitude,
                "accuracy_radius": location.accuracy_radius,
                "time_zone": location.time_zone,
            }),
        );
    }
    Value::Object(payload)
}

#[async_trait]
impl GeoProvider for MaxMindProvider {
    async fn lookup(&self, ip: IpAddr) -> std::result::Result<Value, ProviderError> {
        self.lookup_sync(ip)
    }
}
