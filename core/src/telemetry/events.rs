use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) const TARGET: &str = "telemetry::finalizer";
pub(crate) const EVENT_RESPONSE_BUILT: &str = "response_built";
pub(crate) const EVENT_STATE_PERSISTED: &str = "state_persisted";
pub(crate) const EVENT_STATE_SAVE_FAILED: &str = "state_save_failed";
pub(crate) const EVENT_STAGE_SUPPRESSED: &str = "stage_suppressed";

#[derive(Debug, Serialize)]
pub struct ResponseBuiltEvent<'a> {
    pub user_id: &'a str,
    pub operation: &'static str,
    pub card: Option<&'static str>,
    pub has_reprompt: bool,
    pub should_end_session: bool,
}

#[derive(Debug, Serialize)]
pub struct StatePersistedEvent<'a> {
    pub partition: &'a str,
    pub user_id: &'a str,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct StateSaveFailedEvent<'a> {
    pub partition: &'a str,
    pub user_id: &'a str,
    pub error: &'a str,
}

pub fn record_response_built(
    user_id: &str,
    operation: &'static str,
    card: Option<&'static str>,
    has_reprompt: bool,
    should_end_session: bool,
) {
    let event = ResponseBuiltEvent {
        user_id,
        operation,
        card,
        has_reprompt,
        should_end_session,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_RESPONSE_BUILT,
            operation = event.operation,
            card = event.card.unwrap_or("none"),
            should_end_session = event.should_end_session,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_RESPONSE_BUILT,
            %err,
            "failed to encode response built event"
        ),
    }
}

pub fn record_state_persisted(partition: &str, user_id: &str, latency: Duration) {
    let event = StatePersistedEvent {
        partition,
        user_id,
        latency_ms: duration_to_ms(latency),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_STATE_PERSISTED,
            partition = event.partition,
            latency_ms = event.latency_ms,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_STATE_PERSISTED,
            %err,
            "failed to encode state persisted event"
        ),
    }
}

pub fn record_state_save_failed(partition: &str, user_id: &str, error: &str) {
    let event = StateSaveFailedEvent {
        partition,
        user_id,
        error,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_STATE_SAVE_FAILED,
            partition = event.partition,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_STATE_SAVE_FAILED,
            %err,
            "failed to encode state save failure event"
        ),
    }
}

/// An override gate swallowed a pipeline step.
pub fn record_stage_suppressed(user_id: &str, step: &'static str) {
    info!(
        target: TARGET,
        event = EVENT_STAGE_SUPPRESSED,
        user_id,
        step,
        "pipeline step suppressed by override"
    );
}

fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
