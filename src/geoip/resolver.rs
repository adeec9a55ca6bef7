//! Layered geo-location resolver.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use super::{GeoLocation, GeoProvider, PersistentGeoCache, TtlCache};
use crate::config::GateConfig;
use crate::error::{Error, ProviderError, Result, StoreError};

/// Default bound on one provider lookup.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(2);

/// Default bound on one persistent cache call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

/// Resolves IP addresses to [`GeoLocation`]s.
///
/// Concurrent misses on the same address may each reach the provider; the
/// results are identical so the last write simply wins.
///
/// # Example
///
/// ```ignore
/// use sitegate::geoip::{GeoResolver, MaxMindProvider, TtlCache};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let provider = MaxMindProvider::open("/var/lib/GeoLite2-City.mmdb")?;
/// let resolver = GeoResolver::new(TtlCache::new(Duration::from_secs(3600))?)
///     .with_provider(Arc::new(provider));
///
/// let location = resolver.resolve("203.0.113.7").await?;
/// ```
pub struct GeoResolver {
    cache: TtlCache<GeoLocation>,
    store: Option<Arc<dyn PersistentGeoCache>>,
    provider: Option<Arc<dyn GeoProvider>>,
    provider_timeout: Duration,
    store_timeout: Duration,
}

impl GeoResolver {
    /// Create a resolver with only an in-memory cache.
    pub fn new(cache: TtlCache<GeoLocation>) -> Self {
        Self {
            cache,
            store: None,
            provider: None,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Create a resolver from gate configuration.
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        config.validate()?;
        let cache = TtlCache::new(config.geo_cache_ttl())?;
        Ok(Self::new(cache)
            .with_provider_timeout(config.provider_timeout())
            .with_store_timeout(config.store_timeout()))
    }

    /// Set the external provider consulted on cache misses.
    pub fn with_provider(mut self, provider: Arc<dyn GeoProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the persistent second-level cache.
    pub fn with_store(mut self, store: Arc<dyn PersistentGeoCache>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_provider_timeout(mut self, limit: Duration) -> Self {
        self.provider_timeout = limit;
        self
    }

    pub fn with_store_timeout(mut self, limit: Duration) -> Self {
        self.store_timeout = limit;
        self
    }

    /// The in-memory cache.
    pub fn cache(&self) -> &TtlCache<GeoLocation> {
        &self.cache
    }

    /// Resolve an address.
    ///
    /// Fails with [`Error::ProviderUnavailable`] only when neither cache has
    /// the address and the provider is missing, failing or too slow.
    pub async fn resolve(&self, ip: &str) -> Result<GeoLocation> {
        let key = ip.trim();

        if let Some(location) = self.cache.get(key) {
            return Ok(location);
        }

        if let Some(location) = self.lookup_store(key).await {
            self.cache.set(key, location.clone());
            return Ok(location);
        }

        let addr: IpAddr = key
            .parse()
            .map_err(|_| Error::InvalidIpAddress(key.to_string()))?;
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| Error::ProviderUnavailable("no geo provider configured".to_string()))?;

        let raw = match timeout(self.provider_timeout, provider.lookup(addr)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(Error::ProviderUnavailable(e.to_string())),
            Err(_) => {
                let e = ProviderError::Timeout(self.provider_timeout);
                return Err(Error::ProviderUnavailable(e.to_string()));
            }
        };

        let location = GeoLocation::from_raw(raw);
        self.cache.set(key, location.clone());
        self.save_store(key, &location).await;
        Ok(location)
    }

    /// Persistent cache read; failures count as a miss.
    async fn lookup_store(&self, key: &str) -> Option<GeoLocation> {
        let store = self.store.as_ref()?;
        let result = match timeout(self.store_timeout, store.lookup(key)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout)),
        };
        match result {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Persistent geo cache lookup for {} failed: {}", key, e);
                None
            }
        }
    }

    /// Best-effort persistent cache write.
    async fn save_store(&self, key: &str, location: &GeoLocation) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let result = match timeout(self.store_timeout, store.store(key, location)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout)),
        };
        if let Err(e) = result {
            log::warn!("Persistent geo cache write for {} failed: {}", key, e);
        }
    }
}
