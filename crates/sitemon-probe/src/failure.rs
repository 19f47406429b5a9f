//! Probe failure records.

use std::time::Duration;

use sitemon_config::ServiceSpec;

/// Classification of a failed probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport or connection error before any response arrived.
    Connection,
    /// A response arrived with a status outside [200, 299].
    Status(u16),
    /// Anything else (bad header config, decode error, ...).
    Unexpected(String),
}

/// One observed service failure. Created by the probe, never mutated.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub service: ServiceSpec,
    pub kind: FailureKind,
    /// Wall-clock time of the request itself (excludes the post-failure
    /// wait).
    pub duration: Duration,
    /// Captured HTTP status, when a response was received at all.
    pub status: Option<u16>,
}

impl FailureRecord {
    /// Short reason line for logs and templates.
    pub fn reason(&self) -> String {
        match &self.kind {
            FailureKind::Connection => format!("Could not connect: {}", self.service.url),
            FailureKind::Status(code) => format!("Unsuccessful status code: {code}"),
            FailureKind::Unexpected(message) => message.clone(),
        }
    }

    /// The `{{failure.message}}` template value.
    pub fn message(&self) -> String {
        format!(
            "Failure in {} after {}ms: {}",
            self.service.name,
            self.duration.as_millis(),
            self.reason()
        )
    }
}
