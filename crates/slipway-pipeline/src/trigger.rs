/// Whether the current checkout should start the pipeline at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    Proceed,
    /// Not an error: a push to any other branch simply does not trigger.
    Skip { branch: String },
}

/// The pipeline runs only for the configured branch.
pub fn evaluate(current_branch: &str, configured_branch: &str) -> TriggerDecision {
    if current_branch == configured_branch {
        TriggerDecision::Proceed
    } else {
        TriggerDecision::Skip {
            branch: current_branch.to_owned(),
        }
    }
}
