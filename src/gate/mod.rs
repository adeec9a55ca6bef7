//! Per-request access gate.
//!
//! The gate runs before normal routing. For a request to a registered host
//! it evaluates the site's IP rules and geofence as the site's filter mode
//! requires, fuses the verdicts, and either lets the request through or
//! answers it with the site's 403 block page. Internal failures never
//! escape: they turn into missing verdicts, which block.

mod request;
mod response;

pub use request::{normalize_host, GateRequest};
pub use response::BlockResponse;

use std::net::IpAddr;
use std::sync::Arc;

use crate::artifact::ArtifactCapture;
use crate::audit::{AuditEvent, AuditSink};
use crate::decision::{decide, AccessDecision, GeoVerdict, IpVerdict};
use crate::geoip::GeoResolver;
use crate::registry::SiteConfigProvider;
use crate::rule;
use crate::site::SiteAccessConfig;
use crate::FilterMode;

/// What to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Hand the request to normal handling
    PassThrough,
    /// Answer with this block page
    Blocked(BlockResponse),
}

impl GateOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, GateOutcome::Blocked(_))
    }
}

/// Verdicts behind one decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub decision: AccessDecision,
    pub ip: IpVerdict,
    pub geo: GeoVerdict,
    /// Country of the client, when geo resolution ran and found one
    pub country: Option<String>,
}

/// Access gate over a source of site configs.
///
/// # Example
///
/// ```ignore
/// use sitegate::{AccessGate, GateRequest, LogAuditSink, SiteRegistry};
/// use std::sync::Arc;
///
/// let gate = AccessGate::new(Arc::new(SiteRegistry::load("sites.yaml")?))
///     .with_resolver(Arc::new(resolver))
///     .with_audit_sink(Arc::new(LogAuditSink));
///
/// let request = GateRequest::new(Some("shop.example.com"), Some("203.0.113.7"));
/// if let GateOutcome::Blocked(page) = gate.evaluate(&request).await {
///     return page.into_http();
/// }
/// ```
pub struct AccessGate {
    sites: Arc<dyn SiteConfigProvider>,
    resolver: Option<Arc<GeoResolver>>,
    artifacts: Option<Arc<dyn ArtifactCapture>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl AccessGate {
    /// Create a gate with no geo resolver and no side effects.
    pub fn new(sites: Arc<dyn SiteConfigProvider>) -> Self {
        Self {
            sites,
            resolver: None,
            artifacts: None,
            audit: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<GeoResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_artifact_capture(mut self, capture: Arc<dyn ArtifactCapture>) -> Self {
        self.artifacts = Some(capture);
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Run the gate for one request.
    pub async fn evaluate(&self, request: &GateRequest) -> GateOutcome {
        let Some(hostname) = request.hostname() else {
            return GateOutcome::PassThrough;
        };
        // One snapshot for the whole evaluation
        let Some(config) = self.sites.site_config(&hostname) else {
            return GateOutcome::PassThrough;
        };
        if config.filter_mode == FilterMode::Disabled {
            return GateOutcome::PassThrough;
        }

        let client_ip = request.client_ip();
        let evaluation = self.evaluate_site(&config, client_ip).await;
        if evaluation.decision == AccessDecision::Allowed {
            log::debug!("Allowed {:?} to {}", client_ip, hostname);
            return GateOutcome::PassThrough;
        }

        log::info!(
            "Blocked {:?} to {} (site {}, mode {}, ip {:?}, geo {:?})",
            client_ip,
            hostname,
            config.site_id,
            config.filter_mode,
            evaluation.ip,
            evaluation.geo
        );

        let artifact_path = self.capture_artifact(&config.site_id).await;
        if let Some(sink) = &self.audit {
            sink.record(AuditEvent::blocked(
                config.site_id.clone(),
                client_ip.map(str::to_string),
                evaluation.country,
                artifact_path,
            ));
        }

        GateOutcome::Blocked(BlockResponse::render(&config.block_page, &hostname))
    }

    /// Gate an HTTP request; `Some` carries the 403 response to send.
    pub async fn check_http<B>(
        &self,
        request: &http::Request<B>,
        peer: Option<IpAddr>,
    ) -> Option<http::Response<String>> {
        match self.evaluate(&GateRequest::from_http(request, peer)).await {
            GateOutcome::PassThrough => None,
            GateOutcome::Blocked(page) => Some(page.into_http()),
        }
    }

    /// Decide on a client for one site, without side effects.
    pub async fn evaluate_site(
        &self,
        config: &SiteAccessConfig,
        client_ip: Option<&str>,
    ) -> Evaluation {
        let mode = config.filter_mode;
        if mode == FilterMode::Disabled {
            return Evaluation {
                decision: AccessDecision::Allowed,
                ip: IpVerdict::Unknown,
                geo: GeoVerdict::Unknown,
                country: None,
            };
        }

        let ip = match (mode.needs_ip(), client_ip) {
            (true, Some(addr)) => IpVerdict::from(rule::evaluate(addr, &config.ip_rules)),
            _ => IpVerdict::Unknown,
        };

        let (geo, country) = if mode.needs_geo() {
            self.geo_verdict(config, client_ip).await
        } else {
            (GeoVerdict::Unknown, None)
        };

        Evaluation {
            decision: decide(mode, ip, geo),
            ip,
            geo,
            country,
        }
    }

    async fn geo_verdict(
        &self,
        config: &SiteAccessConfig,
        client_ip: Option<&str>,
    ) -> (GeoVerdict, Option<String>) {
        if let Some(allowed) = config.geo_allowed {
            return (GeoVerdict::from(Some(allowed)), None);
        }

        let (Some(resolver), Some(client_ip)) = (&self.resolver, client_ip) else {
            return (GeoVerdict::Unknown, None);
        };

        let location = match resolver.resolve(client_ip).await {
            Ok(location) => location,
            Err(e) => {
                log::warn!("Geo lookup for {} failed: {}", client_ip, e);
                return (GeoVerdict::Unknown, None);
            }
        };

        let verdict = match (location.point(), &config.geofence) {
            (Some(point), Some(fence)) => GeoVerdict::from(Some(fence.contains(point))),
            (None, _) => {
                log::debug!("No coordinates for {}", client_ip);
                GeoVerdict::Unknown
            }
            (_, None) => {
                log::debug!("Site {} has no geofence", config.site_id);
                GeoVerdict::Unknown
            }
        };
        (verdict, location.country_code)
    }

    async fn capture_artifact(&self, site_id: &str) -> Option<String> {
        let capture = self.artifacts.as_ref()?;
        match capture.capture(site_id).await {
            Ok(path) if !path.is_empty() => Some(path),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Artifact capture for site {} failed: {}", site_id, e);
                None
            }
        }
    }
}
