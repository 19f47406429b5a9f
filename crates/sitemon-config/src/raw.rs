//! Raw config records as they appear in the YAML file.
//!
//! Everything except `systemctl`, a service's `name`, and its `url` is
//! optional here; [`crate::spec`] fills the gaps.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// Top-level config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppConfig {
    pub defaults: Option<DefaultsConfig>,
    /// Path to the restart-control executable (systemctl or compatible).
    pub systemctl: String,
    pub services: Vec<ServiceConfig>,
}

/// The optional `defaults:` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DefaultsConfig {
    pub attempts: Option<u32>,
    pub email_app: Option<Vec<String>>,
    pub email_body: Option<String>,
    pub email_from: Option<String>,
    pub email_subject: Option<String>,
    pub email_to: Option<String>,
    pub exec_timeout_secs: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    /// ISO-8601 period for the timer unit that invokes sitemon; parsed
    /// and carried, never read at runtime.
    pub period: Option<String>,
    pub wait_secs: Option<u64>,
}

/// One entry under `services:`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,
    pub url: String,
    /// Names of services that must be checked in an earlier phase.
    pub after: Option<Vec<String>>,
    pub attempts: Option<u32>,
    /// `false` disables probing entirely (always treated as healthy).
    pub check: Option<bool>,
    pub emails: Option<Vec<EmailConfig>>,
    pub exec_timeout_secs: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    /// Extra request headers, each a "Name: value" string.
    pub headers: Option<Vec<String>>,
    pub period: Option<String>,
    /// systemd units to restart when this service fails.
    pub restarts: Option<Vec<String>>,
    /// Shell commands to run when this service fails.
    pub scripts: Option<Vec<String>>,
    pub wait_secs: Option<u64>,
}

/// One notification target under a service's `emails:` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmailConfig {
    pub email_app: Option<Vec<String>>,
    pub email_body: Option<String>,
    pub email_from: Option<String>,
    pub email_subject: Option<String>,
    pub email_to: Option<String>,
}

impl AppConfig {
    /// Load and parse the config file at `path`.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
