use crate::camera::CameraError;
use crate::config::ConfigError;
use crate::controls::ControlError;
use crate::device::DeviceError;
use crate::storage::StorageError;
use crate::theme::ThemeError;
use crate::workflow::WorkflowError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("leaf analysis failed: {0}")]
    Analysis(String),
}
