//! Agent error types.
//!
//! This module provides [`AgentError`], the error type returned by
//! [`Agent::send`](crate::Agent::send) and the decode helpers.

use api_agent_core::{CipherError, DecodeError, EncodeError};
use http::StatusCode;

/// Errors produced while building, sending or decoding a request.
///
/// Payloads are kept as strings so the error is `Clone`: a failed agent hands
/// out the same error on every later call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// The target URL could not be parsed.
    #[error("invalid url: {0}")]
    Url(String),

    /// A body or header value could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// The wire request could not be assembled.
    #[error("invalid request: {0}")]
    Request(String),

    /// Body encryption or decryption failed.
    #[error("cipher error: {0}")]
    Cipher(String),

    /// Network, DNS or TLS failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// A success response whose body does not match the expected format.
    #[error("decode error: {message}")]
    Decode { status: StatusCode, message: String },

    /// A request or response processor rejected the exchange.
    #[error("processor error: {0}")]
    Processor(String),
}

impl AgentError {
    /// Create a status error.
    pub fn status_error(status: StatusCode, message: impl Into<String>) -> Self {
        AgentError::Status {
            status,
            message: message.into(),
        }
    }

    /// Create a processor error.
    pub fn processor(message: impl Into<String>) -> Self {
        AgentError::Processor(message.into())
    }

    /// The HTTP status associated with this error.
    ///
    /// Errors raised before a response exists report
    /// `500 Internal Server Error`.
    pub fn status(&self) -> StatusCode {
        match self {
            AgentError::Status { status, .. } | AgentError::Decode { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error was recorded while the agent was being configured.
    pub fn is_construction(&self) -> bool {
        matches!(self, AgentError::Url(_) | AgentError::Encode(_))
    }

    /// Human-readable message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            AgentError::Url(msg)
            | AgentError::Encode(msg)
            | AgentError::Request(msg)
            | AgentError::Cipher(msg)
            | AgentError::Transport(msg)
            | AgentError::Processor(msg) => msg,
            AgentError::Status { message, .. } | AgentError::Decode { message, .. } => message,
        }
    }
}

impl From<url::ParseError> for AgentError {
    fn from(err: url::ParseError) -> Self {
        AgentError::Url(err.to_string())
    }
}

impl From<EncodeError> for AgentError {
    fn from(err: EncodeError) -> Self {
        AgentError::Encode(err.to_string())
    }
}

impl From<CipherError> for AgentError {
    fn from(err: CipherError) -> Self {
        AgentError::Cipher(err.to_string())
    }
}

impl From<http::Error> for AgentError {
    fn from(err: http::Error) -> Self {
        AgentError::Request(err.to_string())
    }
}

impl AgentError {
    pub(crate) fn decode(status: StatusCode, err: DecodeError) -> Self {
        AgentError::Decode {
            status,
            message: err.to_string(),
        }
    }
}
