use image::DynamicImage;
use photo_click_common::config::CaptureConfig;

use crate::ffmpeg::FfmpegCamera;
use crate::http::HttpCamera;
use crate::source::CaptureSource;

/// Opens capture handles against a [`CaptureSource`].
///
/// Implementations block; callers on an async runtime should run them on a
/// blocking thread.
pub trait Camera: Send + Sync {
    fn open(&self, source: &CaptureSource) -> Result<Box<dyn CaptureHandle>, CaptureError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// An opened camera. Dropping the handle releases the underlying device or
/// connection.
pub trait CaptureHandle: Send {
    /// Read one frame. `None` when the source yields nothing decodable.
    fn read_frame(&mut self) -> Option<DynamicImage>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("could not open {target}: {reason}")]
    Open { target: String, reason: String },
    #[error("cannot resize to {width}x{height}: {reason}")]
    Resize {
        width: u32,
        height: u32,
        reason: String,
    },
}

impl CaptureError {
    pub fn open(source: &CaptureSource, reason: impl ToString) -> Self {
        Self::Open {
            target: source.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Routes HTTP(S) URLs to [`HttpCamera`] and everything else (device indexes,
/// RTSP, files) to [`FfmpegCamera`].
pub struct SystemCamera {
    http: HttpCamera,
    ffmpeg: FfmpegCamera,
}

impl SystemCamera {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            http: HttpCamera::new(),
            ffmpeg: FfmpegCamera::new(config),
        }
    }
}

impl Camera for SystemCamera {
    fn open(&self, source: &CaptureSource) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        if source.is_http() {
            self.http.open(source)
        } else {
            self.ffmpeg.open(source)
        }
    }

    fn name(&self) -> &str {
        "system"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_index_routes_to_ffmpeg() {
        let mut config = CaptureConfig::default();
        config.device_path_template = "/nonexistent/photo-click-video{index}".into();
        let camera = SystemCamera::new(&config);

        let err = camera.open(&CaptureSource::Index(0)).err().unwrap();
        let CaptureError::Open { target, reason } = err else {
            panic!("expected open error");
        };
        assert_eq!(target, "camera #0");
        assert!(reason.contains("/nonexistent/photo-click-video0"), "{reason}");
    }

    #[test]
    fn unreachable_http_url_fails_to_open() {
        let camera = SystemCamera::new(&CaptureConfig::default());
        let result = camera.open(&CaptureSource::Url("http://127.0.0.1:1/video".into()));
        assert!(matches!(result, Err(CaptureError::Open { .. })));
    }
}
