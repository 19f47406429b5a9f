//! Failure notification via a local mail command.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use tracing::{debug, error, info};

use sitemon_config::{MailSpec, spec::EXEC_TIMEOUT_SECS_DEFAULT};
use sitemon_exec::run_command;
use sitemon_probe::FailureRecord;

use crate::template;

/// Seam for the orchestrator's notification group.
#[async_trait]
pub trait Notify: Send + Sync {
    /// Send one email for one failure/recipient pair. Best-effort; all
    /// failures are logged and contained.
    async fn send(&self, mail: &MailSpec, failure: &FailureRecord);
}

/// Production notifier: renders the templates, writes the body to a
/// scoped temp file, pipes it into the configured mail command.
pub struct MailNotifier {
    dry_run: bool,
}

impl MailNotifier {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    async fn deliver(&self, mail: &MailSpec, failure: &FailureRecord) -> anyhow::Result<()> {
        let body = template::render(&mail.body, failure);

        // The temp file is removed on drop, whatever happens below.
        let body_file = tempfile::NamedTempFile::new().context("create mail body file")?;
        tokio::fs::write(body_file.path(), &body)
            .await
            .context("write mail body")?;
        debug!(path = %body_file.path().display(), "mail body written");

        let mut argv = template::render_mail_args(&mail.app, mail, failure);
        if argv.is_empty() {
            bail!("mail command is empty");
        }
        let program = argv.remove(0);

        let result = run_command(
            Some(body.into_bytes()),
            Path::new(&program),
            &argv,
            Duration::from_secs(EXEC_TIMEOUT_SECS_DEFAULT),
        )
        .await?;
        if !result.success() {
            bail!(
                "{program} exited with {}: {}",
                result.exit_code,
                result.stderr.trim_end()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Notify for MailNotifier {
    async fn send(&self, mail: &MailSpec, failure: &FailureRecord) {
        let Some(to) = mail.to.as_deref() else {
            debug!(service = %failure.service.name, "notification target has no recipient");
            return;
        };
        let label = format!("Email {to} about {}", failure.service.name);
        if self.dry_run {
            info!("exec<DryRun>: {label}");
            return;
        }
        info!("exec: {label}");
        if let Err(e) = self.deliver(mail, failure).await {
            error!("failed to execute '{label}': {e:#}");
        }
    }
}
