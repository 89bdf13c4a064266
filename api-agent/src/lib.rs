//! Fluent HTTP request builder.
//!
//! An [`Agent`] collects method, URL, headers, query, cookies and body through
//! chained setters, then runs one exchange through a pluggable [`Transport`]
//! and decodes the result.
//!
//! ## Features
//!
//! - Form, JSON, XML and Protobuf-JSON request bodies
//! - `multipart/form-data` file uploads
//! - Basic authentication from URL credentials
//! - Transparent body encryption through a [`Cipher`]
//! - Request and response processors
//! - Request/response dumps in debug mode
//!
//! ## Example
//!
//! ```ignore
//! use api_agent::Agent;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct CreateUser<'a> {
//!     name: &'a str,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let (status, user) = Agent::post("https://api.example.com/users")
//!     .header_set("x-api-key", "secret")
//!     .json_data(&CreateUser { name: "ada" })
//!     .json::<User>()
//!     .await?;
//!
//! println!("{} created user {}", status, user.id);
//! ```
//!
//! ## Failure Handling
//!
//! Building never panics. The first failing step (an unparsable URL, a value
//! that cannot be encoded, an invalid header) moves the agent into
//! [`AgentState::Failed`]; later setters are ignored and every send returns
//! that same error without touching the network:
//!
//! ```ignore
//! let mut agent = Agent::get("http://[broken").query_add("a", "1");
//! assert!(agent.is_failed());
//! assert!(agent.text().await.is_err()); // no request was made
//! ```
//!
//! The decode helpers store their failures the same way. Call
//! [`Agent::reset`] to clear the failure (and the recorded response headers)
//! before reusing an agent.
//!
//! ## Status Handling
//!
//! [`Agent::send`] returns any response as-is. The decode helpers treat every
//! non-2xx status as [`AgentError::Status`], whose message is the trimmed
//! response body, or the reason phrase when the body is empty.
//!
//! ## Encrypted Bodies
//!
//! With a [`Cipher`] installed, the request body is encrypted after the debug
//! dump and before the request processor runs. Responses carrying
//! `x-cipher-encoded: true` are decrypted before anything else sees them.
//!
//! ## Cancellation
//!
//! [`Agent::send`] and the decode helpers are plain futures: dropping one
//! aborts the round trip. Timeouts, retries and connection pooling belong to
//! the transport.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `tls` (default) | `tls-ring` + `tls-native-roots` |
//! | `tls-ring` / `tls-aws-lc` | rustls crypto provider |
//! | `tls-native-roots` / `tls-webpki-roots` | Root certificate source |
//!
//! ## Observability
//!
//! Each send runs inside an `http.request` span with `http.method`,
//! `http.url` and `otel.kind`. Debug dumps are logged at `DEBUG` under the
//! `api_agent::dump` target.

mod agent;
mod decode;
mod dump;
mod error;
mod pipeline;
pub mod processor;
pub mod transport;

#[cfg(test)]
mod testing;

pub use agent::{Agent, AgentState};
pub use error::AgentError;
pub use processor::{Cleanup, RequestProcessor, ResponseProcessor};

// Re-export transport types at the top level for convenience
pub use transport::{
    HyperTransport, HyperTransportBuilder, ResponseBody, TlsClientConfig, Transport,
    TransportBody, set_default_transport,
};

// Re-export core types that users need
pub use api_agent_core::{Cipher, CipherError, ContentType, EncodeError, File, SharedCipher};

pub use bytes::Bytes;
pub use cookie::Cookie;
pub use http::{HeaderMap, Method, StatusCode};
