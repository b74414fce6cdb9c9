use std::path::PathBuf;

use photo_click_common::config::CaptureConfig;
use photo_click_common::store::{image_url, snapshot_filename, SnapshotStore, StoreError};
use tracing::{info, warn};

use crate::camera::{Camera, CaptureError};
use crate::frame::resize_frame;
use crate::source::CaptureSource;

/// Output settings for a stored snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotOptions {
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
}

impl From<&CaptureConfig> for SnapshotOptions {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

/// A snapshot that is on disk.
#[derive(Debug, Clone)]
pub struct SavedSnapshot {
    pub filename: String,
    pub url: String,
    pub timestamp: i64,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Could not open camera source")]
    OpenSource(#[source] CaptureError),
    #[error("Failed to read frame from camera")]
    ReadFrame,
    #[error("Failed to write image to disk")]
    WriteImage(#[source] StoreError),
}

/// Capture one frame from `source` and store it as `snapshot_<now>.jpg`.
///
/// Opens exactly one handle and drops it right after the read, whether or not
/// a frame came back. A resize failure keeps the original frame. `now` is read
/// after the frame arrives and returns Unix seconds.
pub fn take_snapshot(
    camera: &dyn Camera,
    source: &CaptureSource,
    store: &SnapshotStore,
    options: &SnapshotOptions,
    now: impl FnOnce() -> i64,
) -> Result<SavedSnapshot, SnapshotError> {
    let mut handle = camera.open(source).map_err(|e| {
        warn!(%source, camera = camera.name(), error = %e, "could not open camera source");
        SnapshotError::OpenSource(e)
    })?;

    let frame = handle.read_frame();
    drop(handle);

    let Some(frame) = frame else {
        warn!(%source, camera = camera.name(), "camera produced no frame");
        return Err(SnapshotError::ReadFrame);
    };

    let frame = match resize_frame(&frame, options.width, options.height) {
        Ok(resized) => resized,
        Err(e) => {
            warn!(
                error = %e,
                width = frame.width(),
                height = frame.height(),
                "keeping original frame size"
            );
            frame
        }
    };

    let timestamp = now();
    let filename = snapshot_filename(timestamp);
    let path = store
        .save_jpeg(&filename, &frame, options.jpeg_quality)
        .map_err(|e| {
            warn!(filename, error = %e, "failed to write snapshot");
            SnapshotError::WriteImage(e)
        })?;

    info!(%source, filename, width = frame.width(), height = frame.height(), "snapshot saved");
    Ok(SavedSnapshot {
        url: image_url(&filename),
        filename,
        timestamp,
        path,
    })
}
