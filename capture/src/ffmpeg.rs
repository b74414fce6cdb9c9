use std::path::Path;
use std::process::{Command, Stdio};

use image::DynamicImage;
use photo_click_common::config::CaptureConfig;
use tracing::{debug, warn};

use crate::camera::{Camera, CaptureError, CaptureHandle};
use crate::source::CaptureSource;

/// Grabs one frame by running ffmpeg against a local device or stream URL.
///
/// ffmpeg exits non-zero when it cannot open its input, which maps to an open
/// failure. A clean exit with no decodable output means the source opened but
/// produced no frame.
#[derive(Debug, Clone)]
pub struct FfmpegCamera {
    ffmpeg_bin: String,
    device_format: String,
    device_path_template: String,
}

impl FfmpegCamera {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            device_format: config.device_format.clone(),
            device_path_template: config.device_path_template.clone(),
        }
    }

    pub fn device_path(&self, index: i64) -> String {
        self.device_path_template.replace("{index}", &index.to_string())
    }

    fn input_args(&self, source: &CaptureSource) -> Result<Vec<String>, CaptureError> {
        match source {
            CaptureSource::Index(index) if *index < 0 => {
                Err(CaptureError::open(source, "negative camera index"))
            }
            CaptureSource::Index(index) => {
                let device = self.device_path(*index);
                if !Path::new(&device).exists() {
                    return Err(CaptureError::open(source, format!("no device at {device}")));
                }
                Ok(vec![
                    "-f".into(),
                    self.device_format.clone(),
                    "-i".into(),
                    device,
                ])
            }
            CaptureSource::Url(url) => Ok(vec!["-i".into(), url.clone()]),
        }
    }
}

impl Camera for FfmpegCamera {
    fn open(&self, source: &CaptureSource) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let input = self.input_args(source)?;

        let output = Command::new(&self.ffmpeg_bin)
            .args(["-hide_banner", "-loglevel", "error"])
            .args(&input)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "mjpeg", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                CaptureError::open(source, format!("failed to run {}: {e}", self.ffmpeg_bin))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("ffmpeg exited with {}", output.status));
            return Err(CaptureError::open(source, reason));
        }

        debug!(%source, bytes = output.stdout.len(), "ffmpeg capture finished");
        Ok(Box::new(FfmpegHandle {
            jpeg: output.stdout,
        }))
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

struct FfmpegHandle {
    jpeg: Vec<u8>,
}

impl CaptureHandle for FfmpegHandle {
    fn read_frame(&mut self) -> Option<DynamicImage> {
        let jpeg = std::mem::take(&mut self.jpeg);
        if jpeg.is_empty() {
            return None;
        }
        match image::load_from_memory(&jpeg) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "ffmpeg produced undecodable frame");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_with(ffmpeg_bin: &str, template: &str) -> FfmpegCamera {
        FfmpegCamera::new(&CaptureConfig {
            ffmpeg_bin: ffmpeg_bin.into(),
            device_path_template: template.into(),
            ..CaptureConfig::default()
        })
    }

    #[test]
    fn device_path_from_template() {
        let camera = camera_with("ffmpeg", "/dev/video{index}");
        assert_eq!(camera.device_path(0), "/dev/video0");
        assert_eq!(camera.device_path(12), "/dev/video12");
    }

    #[test]
    fn missing_device_is_open_failure() {
        let camera = camera_with("ffmpeg", "/nonexistent/video{index}");
        let result = camera.open(&CaptureSource::Index(4));
        let Err(CaptureError::Open { reason, .. }) = result else {
            panic!("expected open error");
        };
        assert!(reason.contains("/nonexistent/video4"));
    }

    #[test]
    fn negative_index_is_open_failure() {
        let camera = camera_with("ffmpeg", "/dev/video{index}");
        assert!(matches!(
            camera.open(&CaptureSource::Index(-1)),
            Err(CaptureError::Open { .. })
        ));
    }

    #[test]
    fn missing_binary_is_open_failure() {
        let camera = camera_with("/nonexistent/ffmpeg", "/dev/video{index}");
        let result = camera.open(&CaptureSource::Url("rtsp://invalid".into()));
        let Err(CaptureError::Open { reason, .. }) = result else {
            panic!("expected open error");
        };
        assert!(reason.contains("/nonexistent/ffmpeg"));
    }

    #[cfg(unix)]
    mod fake_ffmpeg {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::sync::{Mutex, MutexGuard, OnceLock};
        use tempfile::TempDir;

        // Writing an executable while another test forks can fail the exec
        // with ETXTBSY, so scripted tests run one at a time.
        static EXEC_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

        fn lock_exec() -> MutexGuard<'static, ()> {
            EXEC_LOCK
                .get_or_init(|| Mutex::new(()))
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
        }

        /// Stand-in ffmpeg: a shell script with the given body.
        fn script(dir: &TempDir, body: &str) -> String {
            let path = dir.path().join("ffmpeg");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.display().to_string()
        }

        #[test]
        fn nonzero_exit_is_open_failure_with_stderr() {
            let _guard = lock_exec();
            let dir = TempDir::new().unwrap();
            let bin = script(&dir, "echo 'rtsp://invalid: Connection refused' >&2\nexit 1");
            let camera = camera_with(&bin, "/dev/video{index}");

            let result = camera.open(&CaptureSource::Url("rtsp://invalid".into()));
            let Err(CaptureError::Open { reason, .. }) = result else {
                panic!("expected open error");
            };
            assert_eq!(reason, "rtsp://invalid: Connection refused");
        }

        #[test]
        fn empty_output_yields_no_frame() {
            let _guard = lock_exec();
            let dir = TempDir::new().unwrap();
            let bin = script(&dir, "exit 0");
            let camera = camera_with(&bin, "/dev/video{index}");

            let mut handle = camera.open(&CaptureSource::Url("file.mp4".into())).ok().unwrap();
            assert!(handle.read_frame().is_none());
        }

        #[test]
        fn jpeg_output_is_decoded() {
            let _guard = lock_exec();
            let dir = TempDir::new().unwrap();
            let frame_path = dir.path().join("frame.jpg");
            image::DynamicImage::new_rgb8(20, 10).save(&frame_path).unwrap();
            let bin = script(&dir, &format!("cat '{}'", frame_path.display()));
            let camera = camera_with(&bin, "/dev/video{index}");

            let mut handle = camera.open(&CaptureSource::Url("file.mp4".into())).ok().unwrap();
            let frame = handle.read_frame().unwrap();
            assert_eq!((frame.width(), frame.height()), (20, 10));
            assert!(handle.read_frame().is_none(), "exactly one frame per handle");
        }
    }
}
