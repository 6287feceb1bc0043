use thiserror::Error;

/// Misuse of the pipeline. Store failures go to the host instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no response has been built for this request")]
    ResponseNotBuilt,
    #[error("request already completed with stage `{stage}`")]
    AlreadyCompleted { stage: &'static str },
    #[error("state save requested but no persistence target is configured")]
    PersistenceTargetMissing,
}
