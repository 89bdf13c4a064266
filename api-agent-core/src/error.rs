//! Encoding error type.

use std::io;

/// Failure while turning a value into a request body, or while reading an
/// attachment.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// JSON (or Protobuf-JSON) serialization failed.
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// XML serialization failed.
    #[error("xml encoding failed: {0}")]
    Xml(#[from] quick_xml::SeError),

    /// Reading an attachment failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl EncodeError {
    pub(crate) fn io(path: impl Into<String>, source: io::Error) -> Self {
        EncodeError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure while decoding a response body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body is not valid JSON for the target type.
    #[error("json decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is not valid XML for the target type.
    #[error("xml decoding failed: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// The body is not UTF-8.
    #[error("body is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}
