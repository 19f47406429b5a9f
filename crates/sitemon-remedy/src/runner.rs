//! Remediation runner — restarts and scripts.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use sitemon_exec::{CommandResult, ExecError, run_command, run_shell};

/// Seam for the orchestrator's remediation groups.
///
/// Both actions consume their own failures (logged, never returned), so
/// one bad target cannot abort the batch.
#[async_trait]
pub trait Remediate: Send + Sync {
    /// Restart a systemd unit.
    async fn restart(&self, unit: &str, timeout: Duration);
    /// Run a configured shell command.
    async fn run_script(&self, script: &str, timeout: Duration);
}

/// Production remediator backed by systemctl and `/bin/sh`.
pub struct ProcessRemediator {
    systemctl: PathBuf,
    dry_run: bool,
}

impl ProcessRemediator {
    pub fn new(systemctl: PathBuf, dry_run: bool) -> Self {
        Self { systemctl, dry_run }
    }
}

#[async_trait]
impl Remediate for ProcessRemediator {
    async fn restart(&self, unit: &str, timeout: Duration) {
        let label = format!("restart '{unit}'");
        let args = vec!["restart".to_string(), unit.to_string()];
        run_action(&label, self.dry_run, async {
            run_command(None, &self.systemctl, &args, timeout).await
        })
        .await;
    }

    async fn run_script(&self, script: &str, timeout: Duration) {
        run_action(script, self.dry_run, run_shell(script, timeout)).await;
    }
}

/// Log, honor dry-run, execute, and contain the outcome.
///
/// The action future is only polled when dry-run is off, so a dry run
/// spawns nothing.
pub(crate) async fn run_action<F>(label: &str, dry_run: bool, action: F)
where
    F: Future<Output = Result<CommandResult, ExecError>> + Send,
{
    if dry_run {
        info!("exec<DryRun>: {label}");
        return;
    }
    info!("exec: {label}");
    match action.await {
        Ok(result) if result.success() => {}
        Ok(result) => {
            error!(exit_code = result.exit_code, "could not execute: {label}");
            if !result.stderr.is_empty() {
                error!("{}", result.stderr.trim_end());
            }
        }
        Err(e) => error!("failed to execute '{label}': {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn restart_invokes_the_control_executable() {
        // /bin/true accepts any argv and exits 0.
        let remediator = ProcessRemediator::new(PathBuf::from("/bin/true"), false);
        remediator.restart("nginx.service", TIMEOUT).await;
    }

    #[tokio::test]
    async fn failing_restart_is_contained() {
        let remediator = ProcessRemediator::new(PathBuf::from("/bin/false"), false);
        remediator.restart("nginx.service", TIMEOUT).await;
    }

    #[tokio::test]
    async fn missing_control_executable_is_contained() {
        let remediator =
            ProcessRemediator::new(PathBuf::from("/nonexistent/systemctl"), false);
        remediator.restart("nginx.service", TIMEOUT).await;
    }

    #[tokio::test]
    async fn script_runs_through_the_shell() {
        let remediator = ProcessRemediator::new(PathBuf::from("/bin/true"), false);
        remediator.run_script("exit 0", TIMEOUT).await;
        remediator.run_script("exit 7", TIMEOUT).await;
    }

    #[tokio::test]
    async fn dry_run_skips_execution() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let remediator = ProcessRemediator::new(PathBuf::from("/bin/true"), true);
        remediator
            .run_script(&format!("touch {}", marker.display()), TIMEOUT)
            .await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn wet_run_actually_executes() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let remediator = ProcessRemediator::new(PathBuf::from("/bin/true"), false);
        remediator
            .run_script(&format!("touch {}", marker.display()), TIMEOUT)
            .await;
        assert!(marker.exists());
    }
}
