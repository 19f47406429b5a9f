//! sitemon-remedy — remediation actions and failure notification.
//!
//! Two seams for the orchestrator:
//!
//! - [`Remediate`] runs one restart or one script per deduplicated
//!   target. [`ProcessRemediator`] backs it with systemctl and `/bin/sh`.
//! - [`Notify`] sends one email per failure/recipient pair.
//!   [`MailNotifier`] renders the templates, writes the body to a scoped
//!   temp file, and pipes it into the configured mail command.
//!
//! Every failure in here is logged and contained: a bad action never
//! aborts its batch, and only the next probe round can mark a service
//! healthy again.

pub mod notify;
pub mod runner;
pub mod template;

pub use notify::{MailNotifier, Notify};
pub use runner::{ProcessRemediator, Remediate};
