//! sitemon-engine — the orchestration core.
//!
//! Two pieces:
//!
//! - [`planner`] batches services into dependency-ordered phases, once,
//!   before anything is probed. A cyclic or missing dependency aborts
//!   the whole run here.
//! - [`orchestrator`] drives the round-based state machine over the
//!   phase queue: concurrent probe fan-out, deduplicated restart and
//!   script groups (strictly sequenced), notify-once emails, and the
//!   per-service retry budget.
//!
//! ```text
//! plan() ──▶ queue of Phases
//!              │ pop front
//!              ▼
//!         probe all (concurrent) ──── no failures ──▶ next phase
//!              │ failures
//!              ▼
//!         restarts ▶ scripts ▶ notifications   (groups joined in order)
//!              │
//!              ▼
//!         retry under budget? ──▶ push retry phase to back
//! ```

pub mod error;
pub mod orchestrator;
pub mod planner;

pub use error::{PlanError, PlanResult};
pub use orchestrator::{Orchestrator, RunReport};
pub use planner::{Phase, plan};
