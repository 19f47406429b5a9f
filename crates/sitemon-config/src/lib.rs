//! sitemon-config — configuration for the sitemon watchdog.
//!
//! Loads the YAML config file into raw, all-optional records, then
//! materializes them into the default-filled [`ServiceSpec`] /
//! [`MailSpec`] values the rest of the system consumes. No raw record
//! ever reaches the orchestrator.
//!
//! Materialization resolves every omitted field through the defaults
//! chain: per-service override → `defaults:` section → built-in
//! constants.

pub mod error;
pub mod raw;
pub mod spec;

pub use error::{ConfigError, ConfigResult};
pub use raw::{AppConfig, DefaultsConfig, EmailConfig, ServiceConfig};
pub use spec::{Defaults, MailSpec, ServiceSpec, validate_dependencies};
