//! Line framing for the `text/event-stream` body.

use crate::error::LinkedInError;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::Response;
use std::io;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// The event payload of an SSE line, if it carries one. Comments, blank
/// lines and the `id:`/`event:`/`retry:` fields are skipped.
pub fn data_payload(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.trim().is_empty() {
        None
    } else {
        Some(data)
    }
}

/// Split a streaming response body into lines.
pub fn lines(response: Response) -> impl Stream<Item = Result<String, LinkedInError>> + Send {
    let body = response
        .bytes_stream()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err));
    FramedRead::new(
        StreamReader::new(body),
        LinesCodec::new_with_max_length(MAX_LINE_BYTES),
    )
    .map(|line| line.map_err(line_error))
}

fn line_error(err: LinesCodecError) -> LinkedInError {
    match err {
        LinesCodecError::Io(err) => LinkedInError::Io(err),
        LinesCodecError::MaxLineLengthExceeded => {
            LinkedInError::MalformedEvent("event line exceeds the maximum length".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_data_lines_only() {
        assert_eq!(data_payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_payload("data:{\"a\":1}\r"), Some("{\"a\":1}"));
        assert_eq!(data_payload(""), None);
        assert_eq!(data_payload(": keep-alive"), None);
        assert_eq!(data_payload("id: 42"), None);
        assert_eq!(data_payload("event: message"), None);
        assert_eq!(data_payload("retry: 1000"), None);
        assert_eq!(data_payload("data:"), None);
    }
}
