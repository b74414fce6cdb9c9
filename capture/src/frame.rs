use image::imageops::FilterType;
use image::DynamicImage;

use crate::camera::CaptureError;

/// Scale `frame` to exactly `width` x `height`, ignoring aspect ratio.
pub fn resize_frame(
    frame: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<DynamicImage, CaptureError> {
    let reason = if width == 0 || height == 0 {
        Some("target has a zero dimension")
    } else if frame.width() == 0 || frame.height() == 0 {
        Some("frame is empty")
    } else {
        None
    };
    if let Some(reason) = reason {
        return Err(CaptureError::Resize {
            width,
            height,
            reason: reason.into(),
        });
    }

    if frame.width() == width && frame.height() == height {
        return Ok(frame.clone());
    }
    Ok(frame.resize_exact(width, height, FilterType::Triangle))
}
