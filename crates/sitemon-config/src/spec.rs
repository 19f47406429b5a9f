//! Materialized service descriptors.
//!
//! [`ServiceSpec`] is the immutable, default-filled form consumed by the
//! planner and orchestrator. Built-in constants sit at the bottom of the
//! defaults chain.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::raw::{DefaultsConfig, EmailConfig, ServiceConfig};

/// Probe/remediation attempts per service before it is abandoned.
pub const ATTEMPTS_DEFAULT: u32 = 2;
/// Timeout for restart, script, and mail executions.
pub const EXEC_TIMEOUT_SECS_DEFAULT: u64 = 30;
/// Timeout for the HTTP probe (connect and total).
pub const FETCH_TIMEOUT_SECS_DEFAULT: u64 = 30;
/// Delay after a failed probe before the failure is reported.
pub const WAIT_SECS_DEFAULT: u64 = 5;

pub const EMAIL_SUBJECT_DEFAULT: &str = "Problems: {{service.name}}";
pub const EMAIL_BODY_DEFAULT: &str =
    "The following service appears to be down:\n\n{{service.name}}\n\n{{failure.message}}";

fn email_app_default() -> Vec<String> {
    ["/usr/bin/mail", "-s", "{{subject}}", "{{to}}"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Fully resolved global defaults.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub attempts: u32,
    pub email_app: Vec<String>,
    pub email_body: String,
    pub email_from: Option<String>,
    pub email_subject: String,
    pub email_to: Option<String>,
    pub exec_timeout: Duration,
    pub fetch_timeout: Duration,
    pub period: String,
    pub wait: Duration,
}

impl Defaults {
    /// Resolve the optional `defaults:` section against the built-ins.
    pub fn materialize(specified: Option<&DefaultsConfig>) -> Self {
        let given = specified.cloned().unwrap_or_default();
        Self {
            attempts: given.attempts.unwrap_or(ATTEMPTS_DEFAULT),
            email_app: given.email_app.unwrap_or_else(email_app_default),
            email_body: given
                .email_body
                .unwrap_or_else(|| EMAIL_BODY_DEFAULT.to_string()),
            email_from: given.email_from,
            email_subject: given
                .email_subject
                .unwrap_or_else(|| EMAIL_SUBJECT_DEFAULT.to_string()),
            email_to: given.email_to,
            exec_timeout: Duration::from_secs(
                given.exec_timeout_secs.unwrap_or(EXEC_TIMEOUT_SECS_DEFAULT),
            ),
            fetch_timeout: Duration::from_secs(
                given
                    .fetch_timeout_secs
                    .unwrap_or(FETCH_TIMEOUT_SECS_DEFAULT),
            ),
            period: given.period.unwrap_or_else(|| "PT15M".to_string()),
            wait: Duration::from_secs(given.wait_secs.unwrap_or(WAIT_SECS_DEFAULT)),
        }
    }

    /// A [`MailSpec`] built purely from the defaults (used by the
    /// test-email mode).
    pub fn mail_spec(&self) -> MailSpec {
        MailSpec {
            app: self.email_app.clone(),
            body: self.email_body.clone(),
            from: self.email_from.clone(),
            subject: self.email_subject.clone(),
            to: self.email_to.clone(),
        }
    }
}

/// Immutable descriptor for one watched service.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    /// Unique key across the whole service set.
    pub name: String,
    pub url: String,
    /// `false` skips the probe entirely (always healthy).
    pub check: bool,
    /// Names of services that must appear in an earlier phase.
    pub after: Vec<String>,
    pub attempts: u32,
    /// systemd units restarted on failure.
    pub restarts: Vec<String>,
    /// Shell commands run on failure, after the restarts.
    pub scripts: Vec<String>,
    pub emails: Vec<MailSpec>,
    /// Extra probe request headers, each "Name: value".
    pub headers: Vec<String>,
    pub exec_timeout: Duration,
    pub fetch_timeout: Duration,
    /// Post-failure delay charged to the probe before it reports.
    pub wait: Duration,
}

impl ServiceSpec {
    /// Resolve a raw service record against the materialized defaults.
    pub fn materialize(raw: &ServiceConfig, defaults: &Defaults) -> Self {
        Self {
            name: raw.name.clone(),
            url: raw.url.clone(),
            check: raw.check.unwrap_or(true),
            after: raw.after.clone().unwrap_or_default(),
            attempts: raw.attempts.unwrap_or(defaults.attempts),
            restarts: raw.restarts.clone().unwrap_or_default(),
            scripts: raw.scripts.clone().unwrap_or_default(),
            emails: raw
                .emails
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|email| MailSpec::materialize(email, defaults))
                .collect(),
            headers: raw.headers.clone().unwrap_or_default(),
            exec_timeout: raw
                .exec_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.exec_timeout),
            fetch_timeout: raw
                .fetch_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            wait: raw
                .wait_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.wait),
        }
    }
}

/// One fully resolved notification target.
#[derive(Debug, Clone)]
pub struct MailSpec {
    /// Mail command argv; `{{to}}`, `{{subject}}` and the failure
    /// placeholders are substituted before execution.
    pub app: Vec<String>,
    pub body: String,
    pub from: Option<String>,
    pub subject: String,
    /// No recipient makes the whole target a no-op.
    pub to: Option<String>,
}

impl MailSpec {
    fn materialize(raw: &EmailConfig, defaults: &Defaults) -> Self {
        Self {
            app: raw.email_app.clone().unwrap_or_else(|| defaults.email_app.clone()),
            body: raw
                .email_body
                .clone()
                .unwrap_or_else(|| defaults.email_body.clone()),
            from: raw.email_from.clone().or_else(|| defaults.email_from.clone()),
            subject: raw
                .email_subject
                .clone()
                .unwrap_or_else(|| defaults.email_subject.clone()),
            to: raw.email_to.clone().or_else(|| defaults.email_to.clone()),
        }
    }
}

/// Check that every `after` entry names a declared service.
///
/// Runs once, before planning; a violation aborts the whole run.
pub fn validate_dependencies(services: &[ServiceSpec]) -> ConfigResult<()> {
    let names: HashSet<&str> = services.iter().map(|s| s.name.as_str()).collect();
    for service in services {
        for dependency in &service.after {
            if !names.contains(dependency.as_str()) {
                return Err(ConfigError::UnknownDependency {
                    service: service.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }
    Ok(())
}
