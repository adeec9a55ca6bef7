//! Artifact capture for blocked requests.

use async_trait::async_trait;

use crate::error::CaptureError;

/// External service that captures an artifact (a snapshot of the site,
/// a recording, ...) when a request to it is blocked.
#[async_trait]
pub trait ArtifactCapture: Send + Sync {
    /// Capture an artifact and return a reference to it, e.g. `s3://bucket/key`.
    async fn capture(&self, site_id: &str) -> Result<String, CaptureError>;
}
