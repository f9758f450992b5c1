//! Leaf capture-and-analyze workflow.
//!
//! `Idle -> CameraActive -> Captured -> Analyzing -> Result`, with uploads
//! entering at `Captured`, remote captures entering at `Analyzing`, and reset
//! returning to `Idle` from anywhere. The workflow owns the camera stream and
//! the preview file; both are released on reset and on drop.

mod error;
mod machine;
mod session;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub use error::{WorkflowError, WorkflowResult};
pub use machine::{StateMachine, StateTransition, WorkflowEvent, WorkflowState};
pub use session::{AnalysisTicket, CaptureSession, Completion, Preview};

use self::session::TicketKind;
use crate::analysis::LeafDiagnosis;
use crate::camera::{CameraDevice, CameraStream, CAPTURE_JPEG_QUALITY};
use crate::device::{
    DeviceApi, DeviceResult, ImageUpload, LeafAnalysisResponse, UPLOAD_FILE_NAME,
};
use crate::storage::PreviewStore;

struct ActiveCamera {
    stream: Box<dyn CameraStream>,
    ready: bool,
}

pub struct CaptureAnalysisWorkflow<C: CameraDevice> {
    camera_device: C,
    camera: Option<ActiveCamera>,
    previews: PreviewStore,
    machine: StateMachine,
    session: CaptureSession,
    preview_seq: u64,
}

impl<C: CameraDevice> CaptureAnalysisWorkflow<C> {
    pub fn new(camera_device: C, previews: PreviewStore) -> Self {
        Self {
            camera_device,
            camera: None,
            previews,
            machine: StateMachine::new(),
            session: CaptureSession::default(),
            preview_seq: 0,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.machine.state()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn history(&self) -> &[StateTransition] {
        self.machine.history()
    }

    pub fn has_active_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn can_capture(&self) -> bool {
        self.state() == WorkflowState::CameraActive
            && self.camera.as_ref().is_some_and(|camera| camera.ready)
    }

    pub fn can_analyze(&self) -> bool {
        self.state() == WorkflowState::Captured && self.session.image.is_some()
    }

    /// Requests a video-only stream. Denial is recorded on the session and
    /// leaves the workflow in `Idle`; returns whether the camera is now active.
    pub fn open_camera(&mut self) -> WorkflowResult<bool> {
        self.ensure_can(WorkflowEvent::OpenCamera)?;
        self.release_camera();
        self.session.error = None;

        match self.camera_device.open_video() {
            Ok(stream) => {
                self.camera = Some(ActiveCamera {
                    stream,
                    ready: false,
                });
                self.machine.transition(WorkflowEvent::OpenCamera)?;
                tracing::info!("camera stream acquired");
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(error = %err, "camera acquisition failed");
                self.session.error = Some(err.to_string());
                Ok(false)
            }
        }
    }

    /// Latches the readiness signal once the stream has decoded its first frame.
    pub fn poll_camera_ready(&mut self) -> bool {
        let Some(camera) = self.camera.as_mut() else {
            return false;
        };
        if !camera.ready && camera.stream.is_ready() {
            camera.ready = true;
            tracing::debug!("camera ready for capture");
        }
        camera.ready
    }

    /// Snapshots the current frame. A no-op returning `false` until the camera is ready.
    pub fn capture(&mut self) -> WorkflowResult<bool> {
        if !self.can_capture() {
            tracing::debug!(state = ?self.state(), "capture ignored; camera not ready");
            return Ok(false);
        }
        let Some(camera) = self.camera.as_mut() else {
            return Ok(false);
        };

        let encoded = camera
            .stream
            .grab_frame()
            .and_then(|frame| frame.encode_jpeg(CAPTURE_JPEG_QUALITY));
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "frame capture failed");
                self.session.error = Some(err.to_string());
                return Ok(false);
            }
        };

        self.set_image(ImageUpload::jpeg(bytes))?;
        self.release_camera();
        self.machine.transition(WorkflowEvent::Capture)?;
        Ok(true)
    }

    /// Accepts a user-supplied image, bypassing the camera.
    pub fn upload(&mut self, image: ImageUpload) -> WorkflowResult<()> {
        self.ensure_can(WorkflowEvent::Upload)?;
        self.session.error = None;
        self.set_image(image)?;
        self.machine.transition(WorkflowEvent::Upload)?;
        Ok(())
    }

    pub fn upload_file(&mut self, path: &Path) -> WorkflowResult<()> {
        let bytes = std::fs::read(path).map_err(|source| WorkflowError::ReadImage {
            path: path.display().to_string(),
            source,
        })?;
        let mime_type = image::ImageFormat::from_path(path)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());

        self.upload(ImageUpload {
            bytes,
            file_name: UPLOAD_FILE_NAME.to_string(),
            mime_type,
        })
    }

    /// Moves to `Analyzing` and hands out the request to run.
    /// Returns `None` when there is nothing to analyze.
    pub fn submit(&mut self) -> WorkflowResult<Option<AnalysisTicket>> {
        if !self.can_analyze() {
            tracing::debug!(state = ?self.state(), "submit ignored; no image held");
            return Ok(None);
        }
        let Some(image) = self.session.image.clone() else {
            return Ok(None);
        };

        self.machine.transition(WorkflowEvent::Submit)?;
        self.session.error = None;
        self.session.attempt += 1;
        Ok(Some(AnalysisTicket {
            generation: self.session.generation,
            attempt: self.session.attempt,
            kind: TicketKind::Upload(image),
        }))
    }

    /// Starts a capture-and-analyze performed entirely on the device.
    pub fn submit_remote(&mut self) -> WorkflowResult<AnalysisTicket> {
        self.machine.transition(WorkflowEvent::SubmitRemote)?;
        self.session.error = None;
        self.session.attempt += 1;
        Ok(AnalysisTicket {
            generation: self.session.generation,
            attempt: self.session.attempt,
            kind: TicketKind::Remote,
        })
    }

    /// Applies the outcome of a ticket's request, unless the session it was
    /// issued for has since been reset.
    pub fn complete(
        &mut self,
        ticket: AnalysisTicket,
        outcome: DeviceResult<LeafAnalysisResponse>,
    ) -> WorkflowResult<Completion> {
        if ticket.generation != self.session.generation
            || ticket.attempt != self.session.attempt
            || self.state() != WorkflowState::Analyzing
        {
            tracing::info!(
                ticket_generation = ticket.generation,
                session_generation = self.session.generation,
                ticket_attempt = ticket.attempt,
                session_attempt = self.session.attempt,
                state = ?self.state(),
                "discarding stale analysis response"
            );
            return Ok(Completion::Discarded);
        }

        let diagnosis = outcome
            .map_err(|err| err.to_string())
            .and_then(|response| {
                LeafDiagnosis::from_response(response).map_err(|err| err.to_string())
            });

        match diagnosis {
            Ok(diagnosis) => {
                tracing::info!(
                    disease = %diagnosis.disease,
                    confidence = diagnosis.confidence,
                    healthy = diagnosis.healthy,
                    "leaf analysis complete"
                );
                if ticket.kind == TicketKind::Remote {
                    self.session.preview = Some(Preview::Remote {
                        cache_buster: cache_buster(),
                    });
                }
                self.session.result = Some(diagnosis);
                self.machine.transition(WorkflowEvent::AnalysisSucceeded)?;
            }
            Err(message) => {
                tracing::warn!(error = %message, "leaf analysis failed");
                self.session.error = Some(message);
                let event = match ticket.kind {
                    TicketKind::Upload(_) => WorkflowEvent::AnalysisFailed,
                    TicketKind::Remote => WorkflowEvent::RemoteAnalysisFailed,
                };
                self.machine.transition(event)?;
            }
        }
        Ok(Completion::Applied)
    }

    /// Submits the held image and waits for the result.
    pub async fn analyze(&mut self, api: &dyn DeviceApi) -> WorkflowResult<WorkflowState> {
        let Some(ticket) = self.submit()? else {
            return Ok(self.state());
        };
        let outcome = match ticket.image() {
            Some(image) => api.upload_analyze(image).await,
            None => api.capture_analyze().await,
        };
        self.complete(ticket, outcome)?;
        Ok(self.state())
    }

    pub async fn analyze_remote(&mut self, api: &dyn DeviceApi) -> WorkflowResult<WorkflowState> {
        let ticket = self.submit_remote()?;
        let outcome = api.capture_analyze().await;
        self.complete(ticket, outcome)?;
        Ok(self.state())
    }

    /// Releases the camera and preview and clears the session. Safe from any state.
    pub fn reset(&mut self) {
        self.release_camera();
        self.revoke_preview();
        self.session.image = None;
        self.session.result = None;
        self.session.error = None;
        self.session.generation += 1;
        if let Err(err) = self.machine.transition(WorkflowEvent::Reset) {
            tracing::warn!(error = %err, "reset transition rejected");
        }
    }

    fn ensure_can(&self, event: WorkflowEvent) -> WorkflowResult<()> {
        if self.machine.can_transition(event) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                from: self.state(),
                event,
            })
        }
    }

    fn set_image(&mut self, image: ImageUpload) -> WorkflowResult<()> {
        self.preview_seq += 1;
        let preview_id = format!("{}-{}", self.session.generation, self.preview_seq);
        let handle =
            self.previews
                .create_preview(&preview_id, &image.mime_type, &image.bytes)?;

        self.revoke_preview();
        self.session.preview = Some(Preview::Local(handle));
        self.session.image = Some(image);
        Ok(())
    }

    fn release_camera(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            for track in camera.stream.track_ids() {
                camera.stream.stop_track(&track);
            }
            tracing::debug!("camera stream released");
        }
    }

    fn revoke_preview(&mut self) {
        if let Some(Preview::Local(handle)) = self.session.preview.take() {
            if let Err(err) = self.previews.revoke(handle) {
                tracing::warn!(error = %err, "failed to revoke preview");
            }
        }
    }
}

impl<C: CameraDevice> Drop for CaptureAnalysisWorkflow<C> {
    fn drop(&mut self) {
        self.release_camera();
        self.revoke_preview();
    }
}

fn cache_buster() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
