//! Response finalization: build, mark ready, optionally persist, complete.

mod context;
mod error;
mod finalizer;
mod gate;
mod invocation;
mod stage;

pub use context::RequestContext;
pub use error::PipelineError;
pub use finalizer::ResponseFinalizer;
pub use gate::{OverrideFlag, OverrideGate};
pub use invocation::InvocationContext;
pub use stage::{PipelineSignal, PipelineStage};

#[cfg(test)]
mod tests;
