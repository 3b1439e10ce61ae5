use std::time::Duration;

use thiserror::Error;

use crate::app::BuildError;
use crate::domain::{TaskKind, UsecaseError};
use crate::ports::StoreError;
use crate::typed::RegistryError;

#[derive(Debug, Error)]
pub enum CentralError {
    #[error("handler not found for kind={0}")]
    HandlerNotFound(TaskKind),

    #[error("duplicate handler for kind={0}")]
    DuplicateHandler(TaskKind),

    #[error("failed to encode payload for kind={kind}: {source}")]
    Encode {
        kind: TaskKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode payload for kind={kind}: {source}")]
    Decode {
        kind: TaskKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("broker error: {0}")]
    Broker(String),

    #[error("broker is closed")]
    BrokerClosed,

    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Usecase(#[from] UsecaseError),

    #[error("all mail providers failed: {0}")]
    AllProvidersFailed(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("invalid cron expression {expr:?}: {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("{0}")]
    Other(String),
}

impl From<RegistryError> for CentralError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyRegistered(kind) => CentralError::DuplicateHandler(kind),
        }
    }
}

pub type Result<T, E = CentralError> = std::result::Result<T, E>;
