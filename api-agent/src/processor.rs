//! Request and response processors.
//!
//! A processor is a hook that sees the exchange at a fixed point of the
//! pipeline:
//!
//! - a [`RequestProcessor`] receives the fully assembled (and, with a cipher,
//!   encrypted) request just before dispatch. It may substitute the request
//!   and returns a [`Cleanup`] guard that is released once the exchange ends,
//!   whatever the outcome.
//! - a [`ResponseProcessor`] receives the response after decryption and may
//!   replace it or abort the call with an error.
//!
//! Each agent holds at most one processor of each kind; setting another one
//! replaces the previous.
//!
//! # Example
//!
//! ```ignore
//! use api_agent::{Agent, AgentError, Cleanup};
//!
//! let (status, body) = Agent::get("https://example.com/items")
//!     .request_processor(|mut req: http::Request<_>| {
//!         req.headers_mut().insert("x-trace-id", "42".parse().unwrap());
//!         Ok((req, Cleanup::new(|| tracing::debug!("exchange finished"))))
//!     })
//!     .response_processor(|resp: http::Response<_>| {
//!         if resp.headers().contains_key("x-deprecated") {
//!             return Err(AgentError::processor("endpoint is deprecated"));
//!         }
//!         Ok(resp)
//!     })
//!     .text()
//!     .await?;
//! ```

use http::{Request, Response};

use crate::AgentError;
use crate::transport::{ResponseBody, TransportBody};

// ============================================================================
// Cleanup guard
// ============================================================================

/// Deferred action returned by a [`RequestProcessor`].
///
/// The action runs exactly once: when [`Cleanup::run`] is called or when the
/// guard is dropped, whichever comes first. The pipeline holds the guard for
/// the rest of the exchange, so the action also runs when the `send` future is
/// dropped mid-flight.
#[must_use = "dropping the guard runs the cleanup immediately"]
pub struct Cleanup(Option<Box<dyn FnOnce() + Send>>);

impl Cleanup {
    /// Wrap an action to run once the exchange is over.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Cleanup(Some(Box::new(action)))
    }

    /// A guard with nothing to release.
    pub fn noop() -> Self {
        Cleanup(None)
    }

    /// Run the action now.
    pub fn run(mut self) {
        if let Some(action) = self.0.take() {
            action();
        }
    }
}

impl Default for Cleanup {
    fn default() -> Self {
        Self::noop()
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if let Some(action) = self.0.take() {
            action();
        }
    }
}

impl std::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cleanup")
            .field("pending", &self.0.is_some())
            .finish()
    }
}

// ============================================================================
// Processor traits
// ============================================================================

/// Hook invoked with the assembled request right before dispatch.
///
/// Returning an error aborts the call with that error; nothing is sent.
/// Closures of the matching signature implement this trait.
pub trait RequestProcessor: Send + Sync + 'static {
    fn process(
        &self,
        request: Request<TransportBody>,
    ) -> Result<(Request<TransportBody>, Cleanup), AgentError>;
}

impl<F> RequestProcessor for F
where
    F: Fn(Request<TransportBody>) -> Result<(Request<TransportBody>, Cleanup), AgentError>
        + Send
        + Sync
        + 'static,
{
    fn process(
        &self,
        request: Request<TransportBody>,
    ) -> Result<(Request<TransportBody>, Cleanup), AgentError> {
        self(request)
    }
}

/// Hook invoked with the response once the exchange succeeded.
///
/// Its result becomes the result of [`Agent::send`](crate::Agent::send).
/// Closures of the matching signature implement this trait.
pub trait ResponseProcessor: Send + Sync + 'static {
    fn process(&self, response: Response<ResponseBody>)
    -> Result<Response<ResponseBody>, AgentError>;
}

impl<F> ResponseProcessor for F
where
    F: Fn(Response<ResponseBody>) -> Result<Response<ResponseBody>, AgentError>
        + Send
        + Sync
        + 'static,
{
    fn process(
        &self,
        response: Response<ResponseBody>,
    ) -> Result<Response<ResponseBody>, AgentError> {
        self(response)
    }
}
