//! Voxskill Core Library
//!
//! Finalizes voice skill responses: builds the response envelope, optionally
//! persists session attributes, and hands the result to the host.

pub mod config;
pub mod pipeline;
pub mod response;
pub mod store;
pub mod telemetry;

pub use config::FinalizerConfig;
pub use pipeline::{
    InvocationContext, OverrideFlag, OverrideGate, PipelineError, PipelineSignal, PipelineStage,
    RequestContext, ResponseFinalizer,
};
pub use response::{ResponseDirective, ResponseEnvelope};
pub use store::{AttributesStore, InMemoryAttributesStore, StoreError};
