use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

/// JPEG quality used for captured stills.
pub const CAPTURE_JPEG_QUALITY: u8 = 95;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera device unavailable: {message}")]
    Unavailable { message: String },
    #[error("failed to read frame: {message}")]
    FrameRead { message: String },
    #[error("frame buffer is {actual} bytes, expected {expected} for {width}x{height} rgb")]
    FrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("failed to encode frame: {message}")]
    Encode { message: String },
}

/// A decoded RGB8 video frame at the stream's native resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Frame {
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, CameraError> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.width == 0 || self.height == 0 || self.rgb.len() != expected {
            return Err(CameraError::FrameSize {
                width: self.width,
                height: self.height,
                expected,
                actual: self.rgb.len(),
            });
        }

        let mut buffer = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .write_image(&self.rgb, self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|err| CameraError::Encode {
                message: err.to_string(),
            })?;
        Ok(buffer.into_inner())
    }
}

/// Source of video streams. Requests are always video-only.
pub trait CameraDevice {
    fn open_video(&mut self) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// An acquired stream. Holding one keeps the hardware busy until every track is stopped.
pub trait CameraStream {
    fn track_ids(&self) -> Vec<String>;
    fn stop_track(&mut self, track_id: &str);
    /// True once the first frame has been decoded.
    fn is_ready(&self) -> bool;
    fn grab_frame(&mut self) -> Result<Frame, CameraError>;
}

/// Camera backed by a frame file that an external grabber keeps refreshing
/// (for example `fswebcam` writing to a fixed path on a headless rig).
#[derive(Debug, Clone)]
pub struct FrameFileCamera {
    path: PathBuf,
}

impl FrameFileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CameraDevice for FrameFileCamera {
    fn open_video(&mut self) -> Result<Box<dyn CameraStream>, CameraError> {
        match std::fs::metadata(&self.path) {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(CameraError::PermissionDenied);
            }
            Err(err) => {
                return Err(CameraError::Unavailable {
                    message: format!("{}: {err}", self.path.display()),
                });
            }
        }
        tracing::debug!(path = %self.path.display(), "frame file camera opened");
        Ok(Box::new(FrameFileStream {
            path: self.path.clone(),
            live: true,
        }))
    }
}

/// Device for rigs without a local camera; every request is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

impl CameraDevice for NoCamera {
    fn open_video(&mut self) -> Result<Box<dyn CameraStream>, CameraError> {
        Err(CameraError::Unavailable {
            message: "no local camera configured".to_string(),
        })
    }
}

struct FrameFileStream {
    path: PathBuf,
    live: bool,
}

const FRAME_FILE_TRACK: &str = "frame-file-video";

impl CameraStream for FrameFileStream {
    fn track_ids(&self) -> Vec<String> {
        if self.live {
            vec![FRAME_FILE_TRACK.to_string()]
        } else {
            Vec::new()
        }
    }

    fn stop_track(&mut self, track_id: &str) {
        if track_id == FRAME_FILE_TRACK {
            self.live = false;
        }
    }

    fn is_ready(&self) -> bool {
        self.live && image::ImageReader::open(&self.path).is_ok()
    }

    fn grab_frame(&mut self) -> Result<Frame, CameraError> {
        if !self.live {
            return Err(CameraError::FrameRead {
                message: "stream stopped".to_string(),
            });
        }
        decode_frame_file(&self.path)
    }
}

fn decode_frame_file(path: &Path) -> Result<Frame, CameraError> {
    let image = image::open(path).map_err(|err| CameraError::FrameRead {
        message: err.to_string(),
    })?;
    let rgb = image.to_rgb8();
    Ok(Frame {
        width: rgb.width(),
        height: rgb.height(),
        rgb: rgb.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32) -> Frame {
        Frame {
            width,
            height,
            rgb: vec![40; (width * height * 3) as usize],
        }
    }

    #[test]
    fn encode_jpeg_produces_decodable_image_at_native_size() {
        let bytes = solid_frame(16, 8)
            .encode_jpeg(CAPTURE_JPEG_QUALITY)
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn encode_jpeg_rejects_mismatched_buffer() {
        let frame = Frame {
            width: 4,
            height: 4,
            rgb: vec![0; 10],
        };
        assert!(matches!(
            frame.encode_jpeg(CAPTURE_JPEG_QUALITY),
            Err(CameraError::FrameSize { expected: 48, actual: 10, .. })
        ));
    }

    #[test]
    fn no_camera_refuses_every_request() {
        let err = NoCamera.open_video().err().unwrap();
        assert!(matches!(err, CameraError::Unavailable { .. }));
    }

    #[test]
    fn frame_file_camera_reports_missing_device() {
        let mut camera = FrameFileCamera::new("/nonexistent/smartfarm/frame.jpg");
        assert!(matches!(
            camera.open_video(),
            Err(CameraError::Unavailable { .. })
        ));
    }

    #[test]
    fn frame_file_stream_stops_its_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, solid_frame(4, 4).encode_jpeg(90).unwrap()).unwrap();

        let mut stream = FrameFileCamera::new(&path).open_video().unwrap();
        assert!(stream.is_ready());
        assert_eq!(stream.grab_frame().unwrap().width, 4);

        for track in stream.track_ids() {
            stream.stop_track(&track);
        }
        assert!(stream.track_ids().is_empty());
        assert!(!stream.is_ready());
        assert!(stream.grab_frame().is_err());
    }
}
