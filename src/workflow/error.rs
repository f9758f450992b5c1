use thiserror::Error;

use super::machine::{WorkflowEvent, WorkflowState};
use crate::storage::StorageError;

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid workflow transition: from {from:?} using event {event:?}")]
    InvalidTransition {
        from: WorkflowState,
        event: WorkflowEvent,
    },
    #[error("preview storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to read image {path}: {source}")]
    ReadImage {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
