//! End-to-end tests for the access gate.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use sitegate::geoip::{GeoProvider, ManualClock, PersistentGeoCache, TtlCache};
use sitegate::{
    AccessDecision, AccessGate, FilterMode, GateOutcome, GateRequest, GeoLocation, GeoResolver,
    Geofence, MemoryAuditSink, Point, ProviderError, SiteAccessConfig, SiteRegistry, StoreError,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SITES: &str = r#"
sites:
  - hostname: fenced.example.com
    site_id: fenced
    filter_mode: ip_and_geo
    ip_rules:
      - cidr: 203.0.113.0/24
        action: allow
    geofence:
      polygon: [[-1, -1], [1, -1], [1, 1], [-1, 1]]
    block_page:
      title: Not here
      message: This site is only available on campus.
  - hostname: radius.example.com
    site_id: radius
    filter_mode: geo
    geofence:
      center: [0, 0]
      radius_meters: 1200
  - hostname: open.example.com
    filter_mode: disabled
"#;

/// Provider returning a fixed location per address.
struct TableProvider {
    locations: HashMap<IpAddr, Value>,
    calls: AtomicUsize,
}

impl TableProvider {
    fn new(entries: &[(&str, f64, f64)]) -> Self {
        let locations = entries
            .iter()
            .map(|(ip, lon, lat)| {
                (
                    ip.parse().unwrap(),
                    json!({"country": {"iso_code": "ZZ"}, "location": {"latitude": lat, "longitude": lon}}),
                )
            })
            .collect();
        Self {
            locations,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GeoProvider for TableProvider {
    async fn lookup(&self, ip: IpAddr) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.locations.get(&ip).cloned().unwrap_or_else(|| json!({})))
    }
}

struct DownProvider;

#[async_trait]
impl GeoProvider for DownProvider {
    async fn lookup(&self, _ip: IpAddr) -> Result<Value, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }
}

#[derive(Default)]
struct SharedStore {
    items: Mutex<HashMap<String, GeoLocation>>,
}

#[async_trait]
impl PersistentGeoCache for SharedStore {
    async fn lookup(&self, ip: &str) -> Result<Option<GeoLocation>, StoreError> {
        Ok(self.items.lock().get(ip).cloned())
    }

    async fn store(&self, ip: &str, location: &GeoLocation) -> Result<(), StoreError> {
        self.items.lock().insert(ip.to_string(), location.clone());
        Ok(())
    }
}

fn resolver_with(provider: Arc<dyn GeoProvider>) -> Arc<GeoResolver> {
    let cache = TtlCache::new(Duration::from_secs(300)).unwrap();
    Arc::new(GeoResolver::new(cache).with_provider(provider))
}

fn gate(provider: Arc<dyn GeoProvider>) -> AccessGate {
    let registry = Arc::new(SiteRegistry::from_yaml_str(SITES).unwrap());
    AccessGate::new(registry).with_resolver(resolver_with(provider))
}

#[tokio::test]
async fn test_ip_and_geo_allows_matching_client_inside_fence() {
    let provider = Arc::new(TableProvider::new(&[("203.0.113.10", 0.25, 0.25)]));
    let gate = gate(provider);

    let request = GateRequest::new(Some("fenced.example.com"), Some("203.0.113.10"));
    assert_eq!(gate.evaluate(&request).await, GateOutcome::PassThrough);
}

#[tokio::test]
async fn test_ip_and_geo_blocks_when_provider_unavailable() {
    let audit = Arc::new(MemoryAuditSink::new());
    let gate = gate(Arc::new(DownProvider)).with_audit_sink(audit.clone());

    let request = GateRequest::new(Some("fenced.example.com"), Some("203.0.113.10"));
    match gate.evaluate(&request).await {
        GateOutcome::Blocked(page) => {
            assert_eq!(page.title(), "Not here");
            assert!(page.body().contains("only available on campus"));
        }
        GateOutcome::PassThrough => panic!("provider outage must not allow"),
    }

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].site_id, "fenced");
    assert_eq!(events[0].country, None);
}

#[tokio::test]
async fn test_ip_and_geo_blocks_client_outside_rules() {
    let provider = Arc::new(TableProvider::new(&[("198.51.100.1", 0.0, 0.0)]));
    let gate = gate(provider);

    let request = GateRequest::new(Some("fenced.example.com"), Some("198.51.100.1"));
    assert!(gate.evaluate(&request).await.is_blocked());
}

#[tokio::test]
async fn test_radius_fence() {
    let provider = Arc::new(TableProvider::new(&[
        ("192.0.2.1", 0.0, 0.009),
        ("192.0.2.2", 0.0, 0.02),
    ]));
    let gate = gate(provider);

    let near = GateRequest::new(Some("radius.example.com"), Some("192.0.2.1"));
    let far = GateRequest::new(Some("radius.example.com"), Some("192.0.2.2"));
    assert!(!gate.evaluate(&near).await.is_blocked());
    assert!(gate.evaluate(&far).await.is_blocked());
}

#[tokio::test]
async fn test_location_without_coordinates_blocks() {
    // Address unknown to the provider: empty record
    let provider = Arc::new(TableProvider::new(&[]));
    let gate = gate(provider);

    let request = GateRequest::new(Some("radius.example.com"), Some("192.0.2.99"));
    assert!(gate.evaluate(&request).await.is_blocked());
}

#[tokio::test]
async fn test_disabled_site_passes_everything() {
    let provider = Arc::new(TableProvider::new(&[]));
    let gate = gate(provider.clone());

    for ip in ["203.0.113.10", "garbage", "::1"] {
        let request = GateRequest::new(Some("open.example.com"), Some(ip));
        assert_eq!(gate.evaluate(&request).await, GateOutcome::PassThrough);
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_evaluation_is_idempotent() {
    let provider = Arc::new(TableProvider::new(&[("203.0.113.10", 0.25, 0.25)]));
    let gate = gate(provider.clone());

    let request = GateRequest::new(Some("fenced.example.com"), Some("203.0.113.10"));
    let first = gate.evaluate(&request).await;
    let second = gate.evaluate(&request).await;
    assert_eq!(first, second);

    // The second evaluation was served from the in-memory cache
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests() {
    let provider = Arc::new(TableProvider::new(&[
        ("203.0.113.10", 0.25, 0.25),
        ("203.0.113.11", 5.0, 5.0),
    ]));
    let gate = Arc::new(gate(provider));

    let mut handles = Vec::new();
    for i in 0..64 {
        let gate = gate.clone();
        handles.push(tokio::spawn(async move {
            let ip = if i % 2 == 0 { "203.0.113.10" } else { "203.0.113.11" };
            let request = GateRequest::new(Some("fenced.example.com"), Some(ip));
            (i, gate.evaluate(&request).await.is_blocked())
        }));
    }
    for handle in handles {
        let (i, blocked) = handle.await.unwrap();
        assert_eq!(blocked, i % 2 == 1);
    }
}

#[tokio::test]
async fn test_persistent_cache_survives_memory_expiry() {
    let clock = Arc::new(ManualClock::new());
    let cache = TtlCache::with_clock(Duration::from_secs(60), clock.clone()).unwrap();
    let store = Arc::new(SharedStore::default());
    let provider = Arc::new(TableProvider::new(&[("192.0.2.1", 0.0, 0.0)]));
    let resolver = GeoResolver::new(cache)
        .with_provider(provider.clone())
        .with_store(store.clone());

    let first = resolver.resolve("192.0.2.1").await.unwrap();
    clock.advance(Duration::from_secs(61));
    assert_eq!(resolver.cache().get("192.0.2.1"), None);

    let second = resolver.resolve("192.0.2.1").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.cache().len(), 1);
}

#[tokio::test]
async fn test_evaluate_site_directly() {
    let registry = Arc::new(SiteRegistry::new());
    let gate = AccessGate::new(registry);
    let fence = Geofence::circle(Point::new(0.0, 0.0), 1200.0).unwrap();
    let config = SiteAccessConfig::new("direct", FilterMode::Geo).with_geofence(fence);

    // No resolver: geo is unknown and the request is blocked
    let evaluation = gate.evaluate_site(&config, Some("192.0.2.1")).await;
    assert_eq!(evaluation.decision, AccessDecision::Blocked);
}
