//! The round-based check/remediate/retry state machine.
//!
//! The orchestrator owns the live phase queue and the run-lifetime
//! notified set. Both are mutated only between concurrent groups, on
//! the orchestrator's own task, so neither needs a lock.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use sitemon_config::ServiceSpec;
use sitemon_probe::{FailureRecord, Probe};
use sitemon_remedy::{Notify, Remediate};

use crate::planner::Phase;

/// What a finished run looked like. Informational only; even a run full
/// of abandoned services exits 0.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Phase rounds executed (initial phases plus retries).
    pub rounds: u32,
    /// Services that kept failing until their attempt limit.
    pub abandoned: Vec<String>,
}

/// Drives the phase queue to exhaustion.
pub struct Orchestrator<P, R, N> {
    probe: Arc<P>,
    remediator: Arc<R>,
    notifier: Arc<N>,
    /// Services already emailed about during this run. Grows
    /// monotonically; never reset.
    notified: HashSet<String>,
}

impl<P, R, N> Orchestrator<P, R, N>
where
    P: Probe + 'static,
    R: Remediate + 'static,
    N: Notify + 'static,
{
    pub fn new(probe: Arc<P>, remediator: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            probe,
            remediator,
            notifier,
            notified: HashSet::new(),
        }
    }

    /// Run the plan to completion.
    pub async fn run(&mut self, plan: Vec<Phase>) -> RunReport {
        let mut queue: VecDeque<Phase> = plan.into();
        let mut report = RunReport::default();

        while let Some(phase) = queue.pop_front() {
            report.rounds += 1;
            info!(
                phase = phase.index + 1,
                round = phase.round,
                services = ?phase.names(),
                "checking phase"
            );

            let failures = self.check_phase(&phase).await;
            if failures.is_empty() {
                info!(phase = phase.index + 1, "phase complete, all services seem fine");
                continue;
            }

            info!(
                phase = phase.index + 1,
                failures = failures.len(),
                "remediating"
            );
            self.run_restarts(&failures).await;
            self.run_scripts(&failures).await;
            self.notify_failures(&failures).await;

            let (retry, abandoned): (Vec<_>, Vec<_>) = failures
                .into_iter()
                .partition(|f| phase.round < f.service.attempts);

            if !abandoned.is_empty() {
                let names: Vec<String> =
                    abandoned.into_iter().map(|f| f.service.name).collect();
                warn!(services = ?names, "abandoning, attempt limit reached");
                report.abandoned.extend(names);
            }
            if !retry.is_empty() {
                let services: Vec<ServiceSpec> =
                    retry.into_iter().map(|f| f.service).collect();
                info!(
                    phase = phase.index + 1,
                    round = phase.round + 1,
                    services = ?services.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
                    "queueing retry"
                );
                queue.push_back(Phase {
                    index: phase.index,
                    round: phase.round + 1,
                    services,
                });
            }
        }

        report
    }

    /// Probe every service in the phase concurrently and collect the
    /// failures. Completion order is irrelevant.
    async fn check_phase(&self, phase: &Phase) -> Vec<FailureRecord> {
        let mut group = JoinSet::new();
        for service in &phase.services {
            let probe = Arc::clone(&self.probe);
            let service = service.clone();
            group.spawn(async move { probe.check(&service).await });
        }

        let mut failures = Vec::new();
        while let Some(joined) = group.join_next().await {
            match joined {
                Ok(Some(failure)) => failures.push(failure),
                Ok(None) => {}
                // A panicked probe counts as no failure this round; a
                // retrying phase probes it again.
                Err(e) => error!(error = %e, "probe task failed"),
            }
        }
        failures
    }

    async fn run_restarts(&self, failures: &[FailureRecord]) {
        let mut group = JoinSet::new();
        for (unit, timeout) in dedup_targets(failures, |s| s.restarts.as_slice()) {
            let remediator = Arc::clone(&self.remediator);
            group.spawn(async move { remediator.restart(&unit, timeout).await });
        }
        join_group(group, "restart").await;
    }

    async fn run_scripts(&self, failures: &[FailureRecord]) {
        let mut group = JoinSet::new();
        for (script, timeout) in dedup_targets(failures, |s| s.scripts.as_slice()) {
            let remediator = Arc::clone(&self.remediator);
            group.spawn(async move { remediator.run_script(&script, timeout).await });
        }
        join_group(group, "script").await;
    }

    /// One email per configured recipient, for failing services not yet
    /// notified this run. The set is updated before any task is
    /// spawned.
    async fn notify_failures(&mut self, failures: &[FailureRecord]) {
        let mut group = JoinSet::new();
        for failure in failures {
            if !self.notified.insert(failure.service.name.clone()) {
                continue;
            }
            for mail in &failure.service.emails {
                let notifier = Arc::clone(&self.notifier);
                let mail = mail.clone();
                let failure = failure.clone();
                group.spawn(async move { notifier.send(&mail, &failure).await });
            }
        }
        join_group(group, "notification").await;
    }
}

/// Union the targets picked from every failing service, one entry per
/// unique target, carrying the largest contributing exec timeout.
/// BTreeMap keeps dispatch order deterministic.
fn dedup_targets(
    failures: &[FailureRecord],
    pick: fn(&ServiceSpec) -> &[String],
) -> BTreeMap<String, Duration> {
    let mut targets: BTreeMap<String, Duration> = BTreeMap::new();
    for failure in failures {
        for target in pick(&failure.service) {
            targets
                .entry(target.clone())
                .and_modify(|t| *t = (*t).max(failure.service.exec_timeout))
                .or_insert(failure.service.exec_timeout);
        }
    }
    targets
}

/// Wait for every task in the group; a panicked action is logged and
/// swallowed like any other remediation failure.
async fn join_group(mut group: JoinSet<()>, what: &str) {
    while let Some(joined) = group.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "{what} task failed");
        }
    }
}
