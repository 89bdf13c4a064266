//! HTTP transport layer for the agent.
//!
//! The agent never talks to the network itself. It hands the assembled request
//! to a [`Transport`], which performs one round trip and returns the response
//! with a type-erased [`ResponseBody`].
//!
//! [`HyperTransport`] is the provided implementation, built on hyper_util's
//! legacy client. It supports:
//!
//! - HTTP/1.1 and HTTP/2 with automatic protocol negotiation
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//!
//! Agents that are not given a transport use a process-wide default
//! [`HyperTransport`], created on first use.
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots`
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//!
//! # Example
//!
//! ```ignore
//! use api_agent::{Agent, HyperTransport};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let transport = HyperTransport::builder()
//!     .pool_idle_timeout(Duration::from_secs(60))
//!     .build()?;
//!
//! let (status, body) = Agent::get("https://example.com/")
//!     .transport(Arc::new(transport))
//!     .text()
//!     .await?;
//! ```

mod body;
mod connector;
mod hyper;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};

use crate::AgentError;

pub use body::TransportBody;
pub use connector::{
    DangerousAcceptAnyCertVerifier, build_https_connector, danger_accept_invalid_certs_config,
    default_tls_config, has_tls_support,
};
pub use hyper::{HyperTransport, HyperTransportBuilder};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;

/// Type alias for a boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Response body handed back by a [`Transport`].
pub type ResponseBody = UnsyncBoxBody<Bytes, AgentError>;

/// One HTTP round trip.
///
/// Implementations must be safe to share between agents; each call is
/// independent. Failures should be reported as [`AgentError::Transport`].
pub trait Transport: Send + Sync + 'static {
    fn round_trip(
        &self,
        request: Request<TransportBody>,
    ) -> BoxFuture<'static, Result<Response<ResponseBody>, AgentError>>;
}

/// Wrap fully-buffered bytes as a [`ResponseBody`].
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Read a body to the end.
pub async fn collect_body(body: ResponseBody) -> Result<Bytes, AgentError> {
    Ok(body.collect().await?.to_bytes())
}

static DEFAULT_TRANSPORT: OnceLock<Arc<dyn Transport>> = OnceLock::new();

/// Install the process-wide default transport.
///
/// Only the first call (or the first lazy initialisation) wins; a rejected
/// transport is handed back.
pub fn set_default_transport(transport: Arc<dyn Transport>) -> Result<(), Arc<dyn Transport>> {
    DEFAULT_TRANSPORT.set(transport)
}

/// The process-wide default transport, creating a [`HyperTransport`] on first
/// use.
pub fn default_transport() -> Result<Arc<dyn Transport>, AgentError> {
    if let Some(transport) = DEFAULT_TRANSPORT.get() {
        return Ok(transport.clone());
    }
    let transport: Arc<dyn Transport> = Arc::new(HyperTransport::new()?);
    Ok(DEFAULT_TRANSPORT.get_or_init(|| transport).clone())
}
