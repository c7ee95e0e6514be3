//! The slipway pipeline: trigger gate, versioned test build, smoke test with
//! an active readiness poll, and a publish stage that runs only when the
//! smoke outcome is healthy.

pub mod run;
pub mod smoke;
pub mod trigger;

pub use run::{Pipeline, PipelineError, RunContext, RunReport, RunState};
pub use smoke::{HealthProbe, HttpProbe, ProbeError, SmokeOutcome, SmokeReport, wait_for_ready};
pub use trigger::TriggerDecision;
