use std::fmt;

/// Where a single frame is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// Stream or snapshot address: `http(s)://`, `rtsp://`, a file path, ...
    Url(String),
    /// Local capture device number.
    Index(i64),
}

impl CaptureSource {
    /// A non-empty URL wins; otherwise the index, defaulting to device 0.
    pub fn select(camera_url: Option<&str>, camera_index: Option<i64>) -> Self {
        match camera_url.filter(|url| !url.is_empty()) {
            Some(url) => Self::Url(url.to_string()),
            None => Self::Index(camera_index.unwrap_or(0)),
        }
    }

    /// True for `http://` and `https://` URLs.
    pub fn is_http(&self) -> bool {
        match self {
            Self::Url(url) => {
                let lower = url.to_ascii_lowercase();
                lower.starts_with("http://") || lower.starts_with("https://")
            }
            Self::Index(_) => false,
        }
    }
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Index(index) => write!(f, "camera #{index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_takes_precedence_over_index() {
        let source = CaptureSource::select(Some("rtsp://cam/live"), Some(3));
        assert_eq!(source, CaptureSource::Url("rtsp://cam/live".into()));
    }

    #[test]
    fn index_used_without_url() {
        assert_eq!(CaptureSource::select(None, Some(2)), CaptureSource::Index(2));
    }

    #[test]
    fn defaults_to_device_zero() {
        assert_eq!(CaptureSource::select(None, None), CaptureSource::Index(0));
    }

    #[test]
    fn empty_url_falls_back_to_index() {
        assert_eq!(CaptureSource::select(Some(""), Some(1)), CaptureSource::Index(1));
    }

    #[test]
    fn http_detection() {
        assert!(CaptureSource::Url("http://10.0.0.5:8080/video".into()).is_http());
        assert!(CaptureSource::Url("HTTPS://cam.local/snap.jpg".into()).is_http());
        assert!(!CaptureSource::Url("rtsp://invalid".into()).is_http());
        assert!(!CaptureSource::Index(0).is_http());
    }
}
