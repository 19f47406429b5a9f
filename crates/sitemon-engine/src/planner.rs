//! Dependency-aware phase planning.
//!
//! A service lands in the earliest phase whose preceding phases already
//! contain all of its `after` prerequisites. Order within a phase is
//! unspecified; phase members are probed concurrently.

use std::collections::HashSet;

use sitemon_config::ServiceSpec;

use crate::error::{PlanError, PlanResult};

/// One ordered batch of services, probed together.
#[derive(Debug, Clone)]
pub struct Phase {
    /// Stable label; a retry phase keeps the index of the phase whose
    /// failures it carries.
    pub index: usize,
    /// Round number within this phase chain, starting at 1.
    pub round: u32,
    pub services: Vec<ServiceSpec>,
}

impl Phase {
    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Batch `services` into dependency-ordered phases.
///
/// Fixpoint selection: each pass moves every remaining service whose
/// prerequisites are all placed. A pass that moves nothing while
/// services remain means the graph is cyclic or references an
/// undeclared name; the stuck services are reported.
pub fn plan(services: &[ServiceSpec]) -> PlanResult<Vec<Phase>> {
    let mut done: HashSet<String> = HashSet::new();
    let mut remaining: Vec<ServiceSpec> = services.to_vec();
    let mut phases = Vec::new();

    while !remaining.is_empty() {
        let (ready, stuck): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|s| s.after.iter().all(|a| done.contains(a)));
        if ready.is_empty() {
            return Err(PlanError::Unresolvable(
                stuck.into_iter().map(|s| s.name).collect(),
            ));
        }
        done.extend(ready.iter().map(|s| s.name.clone()));
        phases.push(Phase {
            index: phases.len(),
            round: 1,
            services: ready,
        });
        remaining = stuck;
    }

    Ok(phases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spec(name: &str, after: &[&str]) -> ServiceSpec {
        ServiceSpec {
            name: name.to_string(),
            url: format!("http://localhost/{name}"),
            check: true,
            after: after.iter().map(|s| s.to_string()).collect(),
            attempts: 2,
            restarts: Vec::new(),
            scripts: Vec::new(),
            emails: Vec::new(),
            headers: Vec::new(),
            exec_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            wait: Duration::ZERO,
        }
    }

    fn phase_names(phases: &[Phase]) -> Vec<Vec<&str>> {
        phases.iter().map(Phase::names).collect()
    }

    #[test]
    fn independent_services_share_one_phase() {
        let phases = plan(&[spec("a", &[]), spec("b", &[]), spec("c", &[])]).unwrap();
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0].services.len(), 3);
        assert_eq!(phases[0].round, 1);
    }

    #[test]
    fn simple_chain_yields_two_phases() {
        let phases = plan(&[spec("a", &[]), spec("b", &["a"])]).unwrap();
        assert_eq!(phase_names(&phases), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn prerequisites_always_land_strictly_earlier() {
        let services = [
            spec("db", &[]),
            spec("cache", &[]),
            spec("api", &["db", "cache"]),
            spec("web", &["api"]),
            spec("cdn", &["web", "db"]),
        ];
        let phases = plan(&services).unwrap();

        // Every service appears exactly once.
        let placed: Vec<&str> = phases.iter().flat_map(Phase::names).collect();
        assert_eq!(placed.len(), services.len());
        for s in &services {
            assert_eq!(placed.iter().filter(|n| **n == s.name).count(), 1);
        }

        // Each prerequisite sits in a strictly earlier phase.
        let phase_of = |name: &str| {
            phases
                .iter()
                .position(|p| p.names().contains(&name))
                .unwrap()
        };
        for s in &services {
            for a in &s.after {
                assert!(phase_of(a) < phase_of(&s.name), "{a} !< {}", s.name);
            }
        }
    }

    #[test]
    fn cycle_reports_the_stuck_services() {
        let err = plan(&[spec("a", &["b"]), spec("b", &["a"]), spec("ok", &[])]).unwrap_err();
        let PlanError::Unresolvable(names) = err;
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"b".to_string()));
    }

    #[test]
    fn dangling_dependency_names_the_stuck_service() {
        let err = plan(&[spec("x", &["y"])]).unwrap_err();
        let PlanError::Unresolvable(names) = err;
        assert_eq!(names, vec!["x".to_string()]);
        assert!(err_to_string(&names).contains('x'));
    }

    fn err_to_string(names: &[String]) -> String {
        PlanError::Unresolvable(names.to_vec()).to_string()
    }

    #[test]
    fn initial_phases_are_indexed_in_order() {
        let phases = plan(&[spec("a", &[]), spec("b", &["a"]), spec("c", &["b"])]).unwrap();
        let indices: Vec<usize> = phases.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
