//! Test doubles shared by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};

use crate::AgentError;
use crate::transport::{BoxFuture, ResponseBody, Transport, TransportBody, full_body};

/// What the stub saw on the wire.
#[derive(Clone, Debug)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

type Responder =
    Box<dyn Fn(&RecordedRequest) -> Result<Response<ResponseBody>, AgentError> + Send + Sync>;

/// A transport that records every request and answers from a closure.
pub(crate) struct StubTransport {
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
    respond: Responder,
}

impl StubTransport {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Result<Response<ResponseBody>, AgentError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// Always answer `status` with `body`.
    pub fn reply(status: u16, body: &'static str) -> Self {
        Self::new(move |_| Ok(response(status, body)))
    }

    /// Answer 200 with the request body.
    pub fn echo_body() -> Self {
        Self::new(|req| {
            Ok(Response::builder()
                .status(StatusCode::OK)
                .body(full_body(req.body.clone()))
                .unwrap())
        })
    }

    /// Answer 200 with the request query string.
    pub fn echo_query() -> Self {
        Self::new(|req| {
            let query = req.uri.query().unwrap_or_default().to_string();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .body(full_body(query))
                .unwrap())
        })
    }

    /// Fail every round trip.
    pub fn failing(message: &'static str) -> Self {
        Self::new(move |_| Err(AgentError::Transport(message.to_string())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> RecordedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

impl Transport for StubTransport {
    fn round_trip(
        &self,
        request: Request<TransportBody>,
    ) -> BoxFuture<'static, Result<Response<ResponseBody>, AgentError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (parts, body) = request.into_parts();
        let recorded = RecordedRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: body.as_bytes().cloned().unwrap_or_default(),
        };
        let result = (self.respond)(&recorded);
        self.requests.lock().unwrap().push(recorded);
        Box::pin(async move { result })
    }
}

pub(crate) fn response(status: u16, body: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .body(full_body(body))
        .unwrap()
}
