//! Single-frame capture from local devices and network cameras.

pub mod camera;
pub mod ffmpeg;
pub mod frame;
pub mod http;
pub mod mjpeg;
pub mod snapshot;
pub mod source;

pub use camera::{Camera, CaptureError, CaptureHandle, SystemCamera};
pub use snapshot::{take_snapshot, SavedSnapshot, SnapshotError, SnapshotOptions};
pub use source::CaptureSource;
