use std::time::Duration;

use image::DynamicImage;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

use crate::camera::{Camera, CaptureError, CaptureHandle};
use crate::mjpeg;
use crate::source::CaptureSource;

/// Camera reachable over HTTP(S): an MJPEG stream or a still-image endpoint.
#[derive(Debug, Default)]
pub struct HttpCamera;

impl HttpCamera {
    pub fn new() -> Self {
        Self
    }
}

impl Camera for HttpCamera {
    fn open(&self, source: &CaptureSource) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let CaptureSource::Url(url) = source else {
            return Err(CaptureError::open(source, "not an HTTP URL"));
        };

        // Built per capture: the blocking client owns a runtime and must not
        // be created or dropped on an async worker.
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| CaptureError::open(source, e))?;
        let response = client
            .get(url)
            .send()
            .map_err(|e| CaptureError::open(source, e))?;

        if !response.status().is_success() {
            return Err(CaptureError::open(
                source,
                format!("HTTP status {}", response.status().as_u16()),
            ));
        }

        let boundary = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(mjpeg::multipart_boundary);

        info!(url, multipart = boundary.is_some(), "connected to HTTP camera");

        Ok(Box::new(HttpHandle {
            response: Some(response),
            boundary,
        }))
    }

    fn name(&self) -> &str {
        "http"
    }
}

struct HttpHandle {
    response: Option<Response>,
    boundary: Option<String>,
}

impl CaptureHandle for HttpHandle {
    fn read_frame(&mut self) -> Option<DynamicImage> {
        let response = self.response.take()?;

        let bytes = match &self.boundary {
            Some(boundary) => mjpeg::read_first_part(response, boundary)?,
            None => match response.bytes() {
                Ok(b) => b.to_vec(),
                Err(e) => {
                    warn!(error = %e, "failed to read HTTP camera body");
                    return None;
                }
            },
        };

        debug!(bytes = bytes.len(), "received frame bytes");
        match image::load_from_memory(&bytes) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "HTTP camera returned undecodable frame");
                None
            }
        }
    }
}
