//! Request body type for the HTTP transport.
//!
//! This module provides [`TransportBody`], the body type of every request the
//! agent hands to a [`Transport`](super::Transport).

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

use crate::AgentError;

/// A fully-buffered request body.
///
/// The agent always knows the whole body before sending (it may need to
/// encrypt or dump it), so there is no streaming variant.
#[derive(Default)]
pub enum TransportBody {
    /// Empty request body.
    #[default]
    Empty,
    /// Full request body with all data available.
    Full { data: Option<Bytes> },
}

impl TransportBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        TransportBody::Empty
    }

    /// Create a body with the given data. Empty data yields an empty body.
    pub fn full(data: Bytes) -> Self {
        if data.is_empty() {
            TransportBody::Empty
        } else {
            TransportBody::Full { data: Some(data) }
        }
    }

    /// The unsent payload, if any.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            TransportBody::Empty => None,
            TransportBody::Full { data } => data.as_ref(),
        }
    }

    /// Length of the unsent payload.
    pub fn len(&self) -> usize {
        self.as_bytes().map_or(0, Bytes::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Body for TransportBody {
    type Data = Bytes;
    type Error = AgentError;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            TransportBody::Empty => Poll::Ready(None),
            TransportBody::Full { data } => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            TransportBody::Empty => true,
            TransportBody::Full { data } => data.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.len() as u64)
    }
}

impl From<Bytes> for TransportBody {
    fn from(data: Bytes) -> Self {
        TransportBody::full(data)
    }
}

impl std::fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportBody::Empty => write!(f, "TransportBody::Empty"),
            TransportBody::Full { data } => f
                .debug_struct("TransportBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
        }
    }
}
