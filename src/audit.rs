//! Audit events emitted for blocked requests.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::SystemTime;

use crate::decision::AccessDecision;

/// Reason code recorded for requests blocked by a site's access policy.
pub const BLOCK_REASON: &str = "access_policy";

/// Number of events kept by [`MemoryAuditSink`] by default.
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

/// One audited access decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(with = "unix_seconds")]
    pub timestamp: SystemTime,
    pub site_id: String,
    pub client_ip: Option<String>,
    pub country: Option<String>,
    pub decision: AccessDecision,
    pub reason: String,
    pub artifact_path: Option<String>,
}

impl AuditEvent {
    /// Build a block event stamped with the current time.
    pub fn blocked(
        site_id: impl Into<String>,
        client_ip: Option<String>,
        country: Option<String>,
        artifact_path: Option<String>,
    ) -> Self {
        Self {
            timestamp: SystemTime::now(),
            site_id: site_id.into(),
            client_ip,
            country,
            decision: AccessDecision::Blocked,
            reason: BLOCK_REASON.to_string(),
            artifact_path,
        }
    }
}

mod unix_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

/// Destination for audit events.
///
/// Recording is fire-and-forget: a sink must not fail the request.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Writes each event as a JSON line through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => log::info!(target: "sitegate::audit", "{}", line),
            Err(e) => log::warn!("Failed to serialize audit event: {}", e),
        }
    }
}

/// Keeps the most recent events in memory, dropping the oldest.
pub struct MemoryAuditSink {
    capacity: usize,
    events: Mutex<VecDeque<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Events in the order they were recorded.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}
