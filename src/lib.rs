//! Sitegate - per-site access gating by network origin and geography.
//!
//! This crate decides, for each inbound HTTP request to a hosted site,
//! whether the request may proceed or must be answered with a 403 block
//! page. The decision combines the site's IP rules and its geofence
//! according to the site's filter mode.
//!
//! # Features
//!
//! - **IP rules**: IPv4 and IPv6 CIDR rules with longest-prefix precedence
//! - **Geofences**: polygon (inclusive edges) and center + radius fences
//! - **Geo resolution**: TTL cache, optional persistent cache, MaxMind provider
//! - **Default-deny**: missing or failed verdicts block, except in disabled mode
//! - **Hot reload**: site configs are swapped atomically while serving
//! - **Thread-safe**: the gate is shared across concurrent requests
//!
//! # Quick Start
//!
//! ```ignore
//! use sitegate::{AccessGate, FilterMode, GateOutcome, GateRequest, SiteAccessConfig, SiteRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SiteRegistry::new());
//! registry.insert(
//!     "shop.example.com",
//!     SiteAccessConfig::new("shop", FilterMode::Ip)
//!         .with_ip_rule("10.0.0.0/8", "deny")
//!         .with_ip_rule("10.1.0.0/16", "allow"),
//! );
//!
//! let gate = AccessGate::new(registry);
//! let request = GateRequest::new(Some("shop.example.com:443"), Some("10.1.2.3"));
//! assert_eq!(gate.evaluate(&request).await, GateOutcome::PassThrough);
//! ```
//!
//! # Filter Modes
//!
//! - **disabled**: every request passes; nothing is evaluated
//! - **ip**: allowed only when the most specific matching rule allows
//! - **geo**: allowed only when the client's location is inside the fence
//! - **ip_and_geo**: both of the above must hold
//!
//! # Geo Resolution
//!
//! Lookups are served, in order, from an in-memory TTL cache, an optional
//! persistent cache, and finally a [`geoip::GeoProvider`]. Provider outages
//! and timeouts produce no geo verdict, which blocks.

mod action;
mod error;
mod filter_mode;

pub mod artifact;
pub mod audit;
pub mod config;
pub mod decision;
pub mod gate;
pub mod geofence;
pub mod geoip;
pub mod registry;
pub mod rule;
pub mod site;

// Re-export core types
pub use action::Action;
pub use error::{CaptureError, Error, GeofenceError, IpRuleError, ProviderError, Result, StoreError};
pub use filter_mode::FilterMode;

// Re-export decision types
pub use decision::{decide, AccessDecision, GeoVerdict, IpVerdict};

// Re-export gate types
pub use gate::{AccessGate, BlockResponse, Evaluation, GateOutcome, GateRequest};

// Re-export configuration and site snapshots
pub use config::GateConfig;
pub use registry::{SiteConfigProvider, SiteRegistry};
pub use site::{BlockPage, SiteAccessConfig};

// Re-export geo types
pub use geofence::{Geofence, Point};
pub use geoip::{GeoLocation, GeoResolver, MaxMindProvider};

// Re-export audit types
pub use artifact::ArtifactCapture;
pub use audit::{AuditEvent, AuditSink, LogAuditSink, MemoryAuditSink};
