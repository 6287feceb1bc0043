use crate::store::StoreError;

/// Finalization stages for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    #[default]
    Idle,
    Built,
    Ready,
    Persisting,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Built => "built",
            PipelineStage::Ready => "ready",
            PipelineStage::Persisting => "persisting",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

/// Steps that follow envelope construction. External layers drive them
/// through [`super::ResponseFinalizer::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSignal {
    ResponseReady,
    SaveState { force: bool },
    SaveStateError(StoreError),
}

impl PipelineSignal {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineSignal::ResponseReady => "response_ready",
            PipelineSignal::SaveState { .. } => "save_state",
            PipelineSignal::SaveStateError(_) => "save_state_error",
        }
    }
}
