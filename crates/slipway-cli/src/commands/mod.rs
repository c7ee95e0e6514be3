mod doctor;
mod run;
mod setup;
mod smoke;
mod tag;

use slipway_pipeline::PipelineError;

/// Name of the buildx builder slipway creates and uses.
pub(crate) const BUILDER_NAME: &str = "slipway";

pub use doctor::doctor;
pub use run::run;
pub use setup::setup;
pub use smoke::smoke;
pub use tag::tag;

/// Surface captured container logs before turning a smoke failure into the
/// process error.
pub(crate) fn report_failure(err: PipelineError) -> anyhow::Error {
    if let PipelineError::Smoke {
        reason,
        container_logs,
    } = err
    {
        if let Some(logs) = container_logs {
            eprintln!("--- container logs ---");
            eprintln!("{}", logs.trim_end());
            eprintln!("----------------------");
        }
        anyhow::anyhow!("smoke test failed: {reason}")
    } else {
        err.into()
    }
}
