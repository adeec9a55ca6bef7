//! Request facts the gate needs.

use http::header::HOST;
use std::net::IpAddr;

/// The parts of an inbound request the gate looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateRequest {
    host: Option<String>,
    client_ip: Option<String>,
}

impl GateRequest {
    /// Create a request from a raw `Host` value and client address.
    pub fn new(host: Option<&str>, client_ip: Option<&str>) -> Self {
        Self {
            host: host.map(str::to_string),
            client_ip: client_ip.map(str::to_string),
        }
    }

    /// Extract host and client address from an HTTP request.
    ///
    /// The host comes from the `Host` header, falling back to the URI
    /// authority. The client address is the connection peer; forwarding
    /// headers are not trusted here.
    pub fn from_http<B>(request: &http::Request<B>, peer: Option<IpAddr>) -> Self {
        let host = request
            .headers()
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| request.uri().host())
            .map(str::to_string);
        Self {
            host,
            client_ip: peer.map(|ip| ip.to_string()),
        }
    }

    /// Raw host as received.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Host with port stripped and case folded, if any.
    pub fn hostname(&self) -> Option<String> {
        self.host.as_deref().and_then(normalize_host)
    }

    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }
}

/// Normalize a `Host` value for site lookup.
///
/// Strips the port (including from bracketed IPv6 literals), a trailing dot
/// and surrounding whitespace, and lowercases the rest.
pub fn normalize_host(host: &str) -> Option<String> {
    let host = host.trim();
    let name = if let Some(rest) = host.strip_prefix('[') {
        rest.split_once(']').map_or(rest, |(addr, _)| addr)
    } else if host.matches(':').count() == 1 {
        host.split_once(':').map_or(host, |(name, _)| name)
    } else {
        // Bare IPv6 literal or no port at all
        host
    };

    let name = name.trim_end_matches('.').to_lowercase();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
