//! sitemon-probe — health probing for watched services.
//!
//! One HTTP GET per service per round, classified into a
//! [`FailureKind`]. Healthy probes produce nothing; failures produce an
//! immutable [`FailureRecord`] the orchestrator feeds into remediation,
//! notification, and retry accounting.
//!
//! The [`Probe`] trait is the seam the orchestrator fans out over;
//! [`HttpProber`] is the production implementation.

pub mod checker;
pub mod failure;

pub use checker::{HttpProber, Probe};
pub use failure::{FailureKind, FailureRecord};
