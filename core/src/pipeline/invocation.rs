use async_trait::async_trait;

use crate::response::ResponseEnvelope;
use crate::store::StoreError;

/// Host callbacks that end a request. The pipeline calls at most one of them,
/// at most once.
#[async_trait]
pub trait InvocationContext: Send + Sync {
    async fn succeed(&self, envelope: ResponseEnvelope);

    async fn fail(&self, error: StoreError);
}
