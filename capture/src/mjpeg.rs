use bytes::BytesMut;
use std::io::Read;
use tracing::{debug, warn};

const HEADER_END: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 16 * 1024;
/// Give up on a part that grows past this without a closing boundary.
const MAX_PART_BYTES: usize = 8 * 1024 * 1024;

/// Parse state for a `multipart/x-mixed-replace` body.
enum ParseState {
    /// Looking for the `--<boundary>` delimiter.
    SeekingBoundary,
    /// Found the delimiter, now looking for end of part headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting part bytes until the next delimiter.
    CollectingPart,
}

/// Extract the boundary parameter from a multipart `Content-Type` value.
///
/// Returns `None` for non-multipart types. A leading `--` some cameras put in
/// the parameter itself is stripped.
pub fn multipart_boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim().to_ascii_lowercase();
    if !mime.starts_with("multipart/") {
        return None;
    }
    params.find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        let value = value.strip_prefix("--").unwrap_or(value);
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Incremental reader yielding the body of the first part of a multipart stream.
pub struct FirstPartReader {
    delimiter: Vec<u8>,
    buffer: BytesMut,
    state: ParseState,
    scan_from: usize,
}

impl FirstPartReader {
    pub fn new(boundary: &str) -> Self {
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            scan_from: 0,
        }
    }

    /// Feed bytes; returns the first non-empty part body once it is complete.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, &self.delimiter) {
                        let _ = self.buffer.split_to(pos + self.delimiter.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep a tail in case the delimiter spans chunks
                        if self.buffer.len() > self.delimiter.len() {
                            let _ = self.buffer.split_to(self.buffer.len() - self.delimiter.len());
                        }
                        return None;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                        let _ = self.buffer.split_to(pos + HEADER_END.len());
                        self.scan_from = 0;
                        self.state = ParseState::CollectingPart;
                    } else {
                        return None;
                    }
                }
                ParseState::CollectingPart => {
                    let pending = &self.buffer[self.scan_from..];
                    let Some(pos) = find_subsequence(pending, &self.delimiter) else {
                        self.scan_from = self.buffer.len().saturating_sub(self.delimiter.len());
                        return None;
                    };

                    let part_end = self.scan_from + pos;
                    let body = strip_crlf(&self.buffer[..part_end]).to_vec();
                    let _ = self.buffer.split_to(part_end + self.delimiter.len());

                    if !body.is_empty() {
                        return Some(body);
                    }
                    debug!("skipping empty multipart part");
                    self.state = ParseState::SeekingHeaderEnd;
                }
            }
        }
    }

    /// Bytes currently buffered; used to bound memory.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// The stream ended: return a part that was still open, if any.
    pub fn finish(self) -> Option<Vec<u8>> {
        match self.state {
            ParseState::CollectingPart => {
                let body = strip_crlf(&self.buffer);
                (!body.is_empty()).then(|| body.to_vec())
            }
            _ => None,
        }
    }
}

/// Read `reader` until the first part body is complete, the stream ends, or
/// the part exceeds the size limit.
pub fn read_first_part<R: Read>(mut reader: R, boundary: &str) -> Option<Vec<u8>> {
    let mut parser = FirstPartReader::new(boundary);
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => return parser.finish(),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "multipart stream read failed");
                return None;
            }
        };

        if let Some(body) = parser.push_chunk(&chunk[..n]) {
            return Some(body);
        }
        if parser.buffered() > MAX_PART_BYTES {
            warn!(limit = MAX_PART_BYTES, "multipart part too large, giving up");
            return None;
        }
    }
}

fn strip_crlf(body: &[u8]) -> &[u8] {
    body.strip_suffix(b"\r\n").unwrap_or(body)
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
