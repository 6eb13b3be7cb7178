//! Response body used by the gateway service.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;

/// A fully buffered response body, or nothing.
#[derive(Debug, Default)]
pub enum GatewayBody {
    /// JSON documents and other small payloads.
    Buffered(Full<Bytes>),
    /// No content.
    #[default]
    Empty,
}

impl GatewayBody {
    /// Body with no content.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Buffered body from raw bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Serialize `value` as JSON.
    ///
    /// Serialization of plain data structs cannot fail; if it does, the body
    /// is empty.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => Self::from_bytes(bytes),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize JSON response body");
                Self::Empty
            }
        }
    }
}

impl http_body::Body for GatewayBody {
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
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
