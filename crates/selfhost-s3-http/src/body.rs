//! S3 response body types.
//!
//! [`S3ResponseBody`] has three modes:
//!
//! - **Buffered**: XML payloads, error bodies, and the health check.
//! - **Streaming**: object content read from disk in chunks, so a GET never
//!   holds a whole object in memory.
//! - **Empty**: 204 responses, HEAD responses, CORS preflights.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use http_body_util::Full;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// S3 response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Debug, Default)]
pub enum S3ResponseBody {
    /// Buffered body for small responses.
    Buffered(Full<Bytes>),
    /// Object content streamed from an open file.
    Streaming {
        /// Chunked reader over the file.
        stream: ReaderStream<File>,
        /// Object size, reported as the exact size hint.
        len: u64,
    },
    /// Empty body.
    #[default]
    Empty,
}

impl S3ResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a buffered body from an XML byte vector.
    #[must_use]
    pub fn from_xml(xml: Vec<u8>) -> Self {
        Self::Buffered(Full::new(Bytes::from(xml)))
    }

    /// Stream `len` bytes of object content from `file`.
    #[must_use]
    pub fn from_file(file: File, len: u64) -> Self {
        Self::Streaming {
            stream: ReaderStream::new(file),
            len,
        }
    }
}

impl http_body::Body for S3ResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming { stream, .. } => Pin::new(stream)
                .poll_next(cx)
                .map(|chunk| chunk.map(|res| res.map(http_body::Frame::data))),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming { len, .. } => *len == 0,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming { len, .. } => http_body::SizeHint::with_exact(*len),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
