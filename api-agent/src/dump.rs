//! Human-readable request and response dumps for debug mode.
//!
//! Dumps are emitted with `tracing::debug!` under the `api_agent::dump`
//! target, so they only show up when a subscriber enables that target.

use std::fmt::Write;

use http::{HeaderMap, Request, Response, Version};

use crate::AgentError;
use crate::transport::{ResponseBody, TransportBody, collect_body, full_body};

pub(crate) const DUMP_TARGET: &str = "api_agent::dump";

const RULE: &str = "-------------------------------";

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let value = if value.is_sensitive() {
            "<redacted>"
        } else {
            value.to_str().unwrap_or("<binary>")
        };
        let _ = writeln!(out, "{}: {}", name, value);
    }
}

fn write_body(out: &mut String, body: &[u8]) {
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&String::from_utf8_lossy(body));
    }
}

/// Render the request line, headers and body.
pub(crate) fn format_request(request: &Request<TransportBody>) -> String {
    let uri = request.uri();
    let target = uri.path_and_query().map_or("/", |pq| pq.as_str());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {}",
        request.method(),
        target,
        version_str(request.version())
    );
    if let Some(authority) = uri.authority() {
        let _ = writeln!(out, "host: {}", authority);
    }
    write_headers(&mut out, request.headers());
    write_body(&mut out, request.body().as_bytes().map(|b| &b[..]).unwrap_or_default());
    out
}

/// Render the status line, headers and body.
pub(crate) fn format_response(parts: &http::response::Parts, body: &[u8]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", version_str(parts.version), parts.status);
    write_headers(&mut out, &parts.headers);
    write_body(&mut out, body);
    out
}

pub(crate) fn request(request: &Request<TransportBody>) {
    tracing::debug!(target: DUMP_TARGET, "api request\n{}\n{}", RULE, format_request(request));
}

/// Dump a response, buffering its body and re-attaching it.
pub(crate) async fn response(
    response: Response<ResponseBody>,
) -> Result<Response<ResponseBody>, AgentError> {
    let (parts, body) = response.into_parts();
    let body = collect_body(body).await?;
    tracing::debug!(
        target: DUMP_TARGET,
        "api response\n{}\n{}",
        RULE,
        format_response(&parts, &body)
    );
    Ok(Response::from_parts(parts, full_body(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::HeaderValue;

    #[test]
    fn test_format_request() {
        let request = Request::post("http://example.com/items?id=1")
            .header("content-type", "application/json")
            .body(TransportBody::full(Bytes::from_static(b"{\"k\":\"v\"}")))
            .unwrap();

        let dump = format_request(&request);
        assert!(dump.starts_with("POST /items?id=1 HTTP/1.1\n"));
        assert!(dump.contains("host: example.com\n"));
        assert!(dump.contains("content-type: application/json\n"));
        assert!(dump.ends_with("\n{\"k\":\"v\"}"));
    }

    #[test]
    fn test_sensitive_headers_are_redacted() {
        let mut value = HeaderValue::from_static("Basic dTpw");
        value.set_sensitive(true);
        let request = Request::get("http://example.com/")
            .header("authorization", value)
            .body(TransportBody::empty())
            .unwrap();

        let dump = format_request(&request);
        assert!(dump.contains("authorization: <redacted>"));
        assert!(!dump.contains("dTpw"));
    }

    #[tokio::test]
    async fn test_response_body_survives_dump() {
        let response = Response::builder()
            .status(404)
            .header("x-id", "7")
            .body(full_body("missing"))
            .unwrap();

        let response = super::response(response).await.unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.headers()["x-id"], "7");
        assert_eq!(
            collect_body(response.into_body()).await.unwrap(),
            Bytes::from_static(b"missing")
        );
    }

    #[test]
    fn test_format_response() {
        let (parts, _) = Response::builder()
            .status(200)
            .header("content-type", "text/plain")
            .body(())
            .unwrap()
            .into_parts();

        let dump = format_response(&parts, b"hello");
        assert_eq!(dump, "HTTP/1.1 200 OK\ncontent-type: text/plain\n\nhello");
    }
}
