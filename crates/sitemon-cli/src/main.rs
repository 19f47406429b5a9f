//! sitemon — one-shot HTTP service watchdog.
//!
//! Probes every configured service in dependency order, remediates
//! failures (unit restart, script, email) and retries up to each
//! service's attempt limit. Meant to be invoked from a systemd timer;
//! exits 0 unless the config or the dependency graph is broken.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use tracing::{info, warn};

use sitemon_config::{AppConfig, Defaults, ServiceSpec, validate_dependencies};
use sitemon_engine::{Orchestrator, plan};
use sitemon_probe::{FailureKind, FailureRecord, HttpProber};
use sitemon_remedy::{MailNotifier, Notify, ProcessRemediator};

#[derive(Parser)]
#[command(
    name = "sitemon",
    about = "Probe configured HTTP services and remediate failures",
    version,
)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "/etc/sitemon.conf.yaml")]
    config: PathBuf,

    /// Don't actually execute any remediation or notification
    #[arg(short, long)]
    dry_run: bool,

    /// Send a test email with all the defaults, then exit
    #[arg(short, long)]
    test_email: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("sitemon v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_file(&cli.config)?;
    let defaults = Defaults::materialize(config.defaults.as_ref());

    if cli.test_email {
        return send_test_email(&defaults).await;
    }

    let services: Vec<ServiceSpec> = config
        .services
        .iter()
        .map(|raw| ServiceSpec::materialize(raw, &defaults))
        .collect();
    validate_dependencies(&services)?;

    info!(
        "checking {} service{}",
        services.len(),
        if services.len() == 1 { "" } else { "s" }
    );
    let phases = plan(&services)?;
    for phase in &phases {
        info!("phase {}: '{}'", phase.index + 1, phase.names().join("', '"));
    }

    let mut orchestrator = Orchestrator::new(
        Arc::new(HttpProber::new()),
        Arc::new(ProcessRemediator::new(
            PathBuf::from(&config.systemctl),
            cli.dry_run,
        )),
        Arc::new(MailNotifier::new(cli.dry_run)),
    );
    let report = orchestrator.run(phases).await;

    if report.abandoned.is_empty() {
        info!(rounds = report.rounds, "complete");
    } else {
        warn!(
            rounds = report.rounds,
            services = ?report.abandoned,
            "complete, some services are still failing"
        );
    }
    Ok(())
}

/// `-t`: send one email from the defaults and exit, bypassing the
/// engine entirely.
async fn send_test_email(defaults: &Defaults) -> anyhow::Result<()> {
    if defaults.email_to.is_none() {
        bail!("no default To email address available");
    }
    let failure = FailureRecord {
        service: ServiceSpec {
            name: "Fake Service".to_string(),
            url: "fake".to_string(),
            check: true,
            after: Vec::new(),
            attempts: 1,
            restarts: Vec::new(),
            scripts: Vec::new(),
            emails: Vec::new(),
            headers: Vec::new(),
            exec_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            wait: Duration::ZERO,
        },
        kind: FailureKind::Unexpected("Fake Failure".to_string()),
        duration: Duration::ZERO,
        status: None,
    };
    MailNotifier::new(false)
        .send(&defaults.mail_spec(), &failure)
        .await;
    Ok(())
}
