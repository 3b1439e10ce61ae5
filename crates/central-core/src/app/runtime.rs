use std::sync::Arc;

use crate::domain::TaskEnvelope;
use crate::error::CentralError;
use crate::typed::{TaskContext, TypedRegistry};

/// Runtime executes a `TaskEnvelope` by dispatching to the registered handler.
///
/// The handler future is dropped once the envelope's timeout elapses; the
/// caller sees `CentralError::Timeout` and treats it like any other failure.
pub struct Runtime {
    registry: Arc<TypedRegistry>,
}

impl Runtime {
    pub fn new(registry: TypedRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &TypedRegistry {
        &self.registry
    }

    /// Execute one attempt of `envelope`.
    pub async fn execute(&self, envelope: &TaskEnvelope, attempt: u32) -> Result<(), CentralError> {
        let kind = envelope.kind();
        let handler = self
            .registry
            .get(kind)
            .ok_or(CentralError::HandlerNotFound(kind))?;

        let ctx = TaskContext {
            task_id: envelope.task_id(),
            kind,
            attempt,
            max_retry: envelope.max_retry(),
            timeout: envelope.timeout(),
        };

        match tokio::time::timeout(
            envelope.timeout(),
            handler.handle_dyn(ctx, envelope.payload().clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(CentralError::Timeout(envelope.timeout())),
        }
    }
}
