use std::sync::Arc;

use tracing::debug;

use crate::config::FinalizerConfig;
use crate::pipeline::error::PipelineError;
use crate::pipeline::gate::{OverrideFlag, OverrideGate};
use crate::pipeline::invocation::InvocationContext;
use crate::pipeline::stage::PipelineStage;
use crate::response::{Attributes, ResponseEnvelope};

/// State of a single request while its response is being finalized.
///
/// Created per incoming request and dropped once the host has been answered.
pub struct RequestContext {
    user_id: String,
    attributes: Attributes,
    pending_state: Option<String>,
    persistence_target: Option<String>,
    persist_before_completion: bool,
    final_response: Option<ResponseEnvelope>,
    gate: Arc<dyn OverrideGate>,
    stage: PipelineStage,
    invocation: Option<Arc<dyn InvocationContext>>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("user_id", &self.user_id)
            .field("pending_state", &self.pending_state)
            .field("persistence_target", &self.persistence_target)
            .field("persist_before_completion", &self.persist_before_completion)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    pub fn new<S: Into<String>>(user_id: S, invocation: Arc<dyn InvocationContext>) -> Self {
        Self {
            user_id: user_id.into(),
            attributes: Attributes::new(),
            pending_state: None,
            persistence_target: None,
            persist_before_completion: false,
            final_response: None,
            gate: Arc::new(OverrideFlag::default()),
            stage: PipelineStage::Idle,
            invocation: Some(invocation),
        }
    }

    pub fn from_config<S: Into<String>>(
        user_id: S,
        attributes: Attributes,
        config: &FinalizerConfig,
        invocation: Arc<dyn InvocationContext>,
    ) -> Self {
        let mut context = Self::new(user_id, invocation).with_attributes(attributes);
        context.persistence_target = config.attributes_table.clone();
        context.persist_before_completion = config.save_before_response;
        context
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_pending_state<S: Into<String>>(mut self, state: S) -> Self {
        self.pending_state = Some(state.into());
        self
    }

    pub fn with_persistence_target<S: Into<String>>(mut self, partition: S) -> Self {
        self.persistence_target = Some(partition.into());
        self
    }

    pub fn persist_before_completion(mut self, enabled: bool) -> Self {
        self.persist_before_completion = enabled;
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn OverrideGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn pending_state(&self) -> Option<&str> {
        self.pending_state.as_deref()
    }

    pub fn persistence_target(&self) -> Option<&str> {
        self.persistence_target.as_deref()
    }

    pub fn persists_before_completion(&self) -> bool {
        self.persist_before_completion
    }

    pub fn final_response(&self) -> Option<&ResponseEnvelope> {
        self.final_response.as_ref()
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn is_overridden(&self) -> bool {
        self.gate.is_overridden()
    }

    pub(crate) fn ensure_open(&self) -> Result<(), PipelineError> {
        if self.stage.is_terminal() {
            return Err(PipelineError::AlreadyCompleted {
                stage: self.stage.as_str(),
            });
        }
        Ok(())
    }

    pub(crate) fn response(&self) -> Result<&ResponseEnvelope, PipelineError> {
        self.final_response
            .as_ref()
            .ok_or(PipelineError::ResponseNotBuilt)
    }

    pub(crate) fn response_mut(&mut self) -> Result<&mut ResponseEnvelope, PipelineError> {
        self.final_response
            .as_mut()
            .ok_or(PipelineError::ResponseNotBuilt)
    }

    pub(crate) fn store_response(&mut self, envelope: ResponseEnvelope) {
        self.final_response = Some(envelope);
        self.transition(PipelineStage::Built);
    }

    pub(crate) fn transition(&mut self, next: PipelineStage) {
        debug!(
            target: "pipeline",
            user_id = %self.user_id,
            from = self.stage.as_str(),
            to = next.as_str(),
            "stage transition"
        );
        self.stage = next;
    }

    /// Hands out the host callbacks once; later calls get `None`.
    pub(crate) fn take_invocation(&mut self) -> Option<Arc<dyn InvocationContext>> {
        self.invocation.take()
    }
}
