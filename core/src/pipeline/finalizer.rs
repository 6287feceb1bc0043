use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info};

use crate::pipeline::context::RequestContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::stage::{PipelineSignal, PipelineStage};
use crate::response::{build_response, CardContent, ResponseDirective, STATE_KEY};
use crate::store::{AttributesStore, StoreError};
use crate::telemetry::events::{
    record_response_built, record_stage_suppressed, record_state_persisted,
    record_state_save_failed,
};

const TARGET: &str = "pipeline";

/// Drives a request from envelope construction to host completion.
///
/// Every step first consults the context's override gate; an overridden
/// step does nothing and reports the stage the context is already in.
#[derive(Clone)]
pub struct ResponseFinalizer {
    store: Arc<dyn AttributesStore>,
}

impl std::fmt::Debug for ResponseFinalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFinalizer").finish_non_exhaustive()
    }
}

impl ResponseFinalizer {
    pub fn new(store: Arc<dyn AttributesStore>) -> Self {
        Self { store }
    }

    pub async fn tell(
        &self,
        ctx: &mut RequestContext,
        speech: &str,
    ) -> Result<PipelineStage, PipelineError> {
        self.respond(ctx, ResponseDirective::tell(speech)).await
    }

    pub async fn ask(
        &self,
        ctx: &mut RequestContext,
        speech: &str,
        reprompt: &str,
    ) -> Result<PipelineStage, PipelineError> {
        self.respond(ctx, ResponseDirective::ask(speech, reprompt))
            .await
    }

    pub async fn ask_with_card(
        &self,
        ctx: &mut RequestContext,
        speech: &str,
        reprompt: &str,
        card: CardContent,
    ) -> Result<PipelineStage, PipelineError> {
        let directive = ResponseDirective::AskWithCard {
            speech: speech.to_string(),
            reprompt: reprompt.to_string(),
            card,
        };
        self.respond(ctx, directive).await
    }

    pub async fn tell_with_card(
        &self,
        ctx: &mut RequestContext,
        speech: &str,
        card: CardContent,
    ) -> Result<PipelineStage, PipelineError> {
        let directive = ResponseDirective::TellWithCard {
            speech: speech.to_string(),
            card,
        };
        self.respond(ctx, directive).await
    }

    pub async fn tell_with_link_account_card(
        &self,
        ctx: &mut RequestContext,
        speech: &str,
    ) -> Result<PipelineStage, PipelineError> {
        let directive = ResponseDirective::TellWithLinkAccountCard {
            speech: speech.to_string(),
        };
        self.respond(ctx, directive).await
    }

    pub async fn ask_with_link_account_card(
        &self,
        ctx: &mut RequestContext,
        speech: &str,
        reprompt: &str,
    ) -> Result<PipelineStage, PipelineError> {
        let directive = ResponseDirective::AskWithLinkAccountCard {
            speech: speech.to_string(),
            reprompt: reprompt.to_string(),
        };
        self.respond(ctx, directive).await
    }

    /// Builds the envelope for `directive`, stores it on the context and runs
    /// the completion steps.
    pub async fn respond(
        &self,
        ctx: &mut RequestContext,
        directive: ResponseDirective,
    ) -> Result<PipelineStage, PipelineError> {
        let kind = directive.kind();
        if ctx.is_overridden() {
            record_stage_suppressed(ctx.user_id(), kind);
            return Ok(ctx.stage());
        }
        ctx.ensure_open()?;

        let envelope = build_response(directive.into_options(ctx.attributes()));
        record_response_built(
            ctx.user_id(),
            kind,
            envelope.response.card.as_ref().map(|card| card.as_str()),
            envelope.response.reprompt.is_some(),
            envelope.should_end_session(),
        );
        ctx.store_response(envelope);

        self.dispatch(ctx, PipelineSignal::ResponseReady).await
    }

    /// Runs a single post-build step.
    pub async fn dispatch(
        &self,
        ctx: &mut RequestContext,
        signal: PipelineSignal,
    ) -> Result<PipelineStage, PipelineError> {
        match signal {
            PipelineSignal::ResponseReady => self.response_ready(ctx).await,
            PipelineSignal::SaveState { force } => self.save_state(ctx, force).await,
            PipelineSignal::SaveStateError(err) => self.save_state_error(ctx, err).await,
        }
    }

    /// Stamps the pending workflow state on the envelope snapshot, then either
    /// saves state or completes.
    pub async fn response_ready(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<PipelineStage, PipelineError> {
        if ctx.is_overridden() {
            record_stage_suppressed(ctx.user_id(), "response_ready");
            return Ok(ctx.stage());
        }
        ctx.ensure_open()?;

        let pending_state = ctx.pending_state().map(str::to_owned);
        let envelope = ctx.response_mut()?;
        if let Some(state) = pending_state {
            envelope.stamp_state(&state);
        }
        ctx.transition(PipelineStage::Ready);

        if ctx.persistence_target().is_some() {
            return self.save_state(ctx, false).await;
        }

        self.complete(ctx).await
    }

    /// Persists the session attributes when the turn requires it.
    ///
    /// `force` also writes the pending workflow state into the attributes
    /// themselves and persists regardless of whether the session ends. A
    /// forced save needs no built envelope; without one the request ends
    /// `Done` with no `succeed` call, or `Failed` through the error path.
    pub async fn save_state(
        &self,
        ctx: &mut RequestContext,
        force: bool,
    ) -> Result<PipelineStage, PipelineError> {
        if ctx.is_overridden() {
            record_stage_suppressed(ctx.user_id(), "save_state");
            return Ok(ctx.stage());
        }
        ctx.ensure_open()?;
        let should_end_session = match ctx.final_response() {
            Some(envelope) => envelope.should_end_session(),
            None if force => false,
            None => return Err(PipelineError::ResponseNotBuilt),
        };

        if !(ctx.persists_before_completion() || force || should_end_session) {
            return self.complete(ctx).await;
        }

        let partition = ctx
            .persistence_target()
            .map(str::to_owned)
            .ok_or(PipelineError::PersistenceTargetMissing)?;

        if force {
            if let Some(state) = ctx.pending_state().map(str::to_owned) {
                ctx.attributes_mut()
                    .insert(STATE_KEY.to_string(), Value::String(state));
            }
        }

        ctx.transition(PipelineStage::Persisting);
        let started = Instant::now();
        let result = self
            .store
            .set(&partition, ctx.user_id(), ctx.attributes())
            .await;

        match result {
            Ok(()) => {
                record_state_persisted(&partition, ctx.user_id(), started.elapsed());
                if ctx.final_response().is_none() {
                    return Ok(self.finish_without_response(ctx));
                }
                self.complete(ctx).await
            }
            Err(err) => self.save_state_error(ctx, err).await,
        }
    }

    /// Ends a request whose forced save ran without any envelope. No partial
    /// envelope is handed to the host, so `succeed` is never called.
    fn finish_without_response(&self, ctx: &mut RequestContext) -> PipelineStage {
        drop(ctx.take_invocation());
        ctx.transition(PipelineStage::Done);
        info!(
            target: TARGET,
            user_id = %ctx.user_id(),
            "state saved without a response"
        );
        ctx.stage()
    }

    /// Reports a failed state save to the host. Not retried.
    pub async fn save_state_error(
        &self,
        ctx: &mut RequestContext,
        err: StoreError,
    ) -> Result<PipelineStage, PipelineError> {
        if ctx.is_overridden() {
            record_stage_suppressed(ctx.user_id(), "save_state_error");
            return Ok(ctx.stage());
        }
        ctx.ensure_open()?;

        let partition = ctx.persistence_target().unwrap_or("-").to_owned();
        error!(
            target: TARGET,
            partition = %partition,
            user_id = %ctx.user_id(),
            error = %err,
            chain = %error_chain(&err),
            "error saving state"
        );
        record_state_save_failed(&partition, ctx.user_id(), &err.to_string());

        let invocation = ctx
            .take_invocation()
            .ok_or_else(|| PipelineError::AlreadyCompleted {
                stage: ctx.stage().as_str(),
            })?;
        invocation.fail(err).await;
        ctx.transition(PipelineStage::Failed);
        Ok(ctx.stage())
    }

    async fn complete(&self, ctx: &mut RequestContext) -> Result<PipelineStage, PipelineError> {
        let envelope = ctx.response()?.clone();
        let invocation = ctx
            .take_invocation()
            .ok_or_else(|| PipelineError::AlreadyCompleted {
                stage: ctx.stage().as_str(),
            })?;

        invocation.succeed(envelope).await;
        ctx.transition(PipelineStage::Done);
        info!(
            target: TARGET,
            user_id = %ctx.user_id(),
            "response delivered"
        );
        Ok(ctx.stage())
    }
}

/// Flattens an error and its sources into `outer: inner: ...`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
