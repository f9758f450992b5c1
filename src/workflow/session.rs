use crate::analysis::LeafDiagnosis;
use crate::device::{latest_leaf_image_url, ImageUpload};
use crate::storage::PreviewHandle;

/// Where the still being shown lives.
#[derive(Debug, PartialEq, Eq)]
pub enum Preview {
    /// Preview file written from a captured or uploaded image.
    Local(PreviewHandle),
    /// Image stored on the device by a remote capture, addressed with a cache buster.
    Remote { cache_buster: u64 },
}

impl Preview {
    pub fn location(&self, device_base_url: &str) -> String {
        match self {
            Self::Local(handle) => handle.path().display().to_string(),
            Self::Remote { cache_buster } => latest_leaf_image_url(device_base_url, *cache_buster),
        }
    }
}

/// State bundle for one capture-and-analyze attempt.
#[derive(Debug, Default)]
pub struct CaptureSession {
    pub(super) generation: u64,
    /// Bumped on every submission so each ticket applies at most once.
    pub(super) attempt: u64,
    pub(super) image: Option<ImageUpload>,
    pub(super) preview: Option<Preview>,
    pub(super) result: Option<LeafDiagnosis>,
    pub(super) error: Option<String>,
}

impl CaptureSession {
    /// Identity of the session; bumped on every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn image(&self) -> Option<&ImageUpload> {
        self.image.as_ref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn result(&self) -> Option<&LeafDiagnosis> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum TicketKind {
    Upload(ImageUpload),
    Remote,
}

/// Handle for an analysis request that is in flight.
///
/// The request runs detached from the workflow; its outcome is applied through
/// `CaptureAnalysisWorkflow::complete`, which discards tickets from an older
/// session or an earlier attempt. Not `Clone`: a ticket is consumed once.
#[derive(Debug, PartialEq, Eq)]
pub struct AnalysisTicket {
    pub(super) generation: u64,
    pub(super) attempt: u64,
    pub(super) kind: TicketKind,
}

impl AnalysisTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Image to upload, or `None` for a remote capture.
    pub fn image(&self) -> Option<&ImageUpload> {
        match &self.kind {
            TicketKind::Upload(image) => Some(image),
            TicketKind::Remote => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Discarded,
}
