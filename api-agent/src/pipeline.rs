//! The execution pipeline behind [`Agent::send`].

use std::borrow::Cow;

use api_agent_core::{CIPHER_ENCODED_HEADER, MultipartBody, SharedCipher};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, HeaderValue, Request, Response};
use percent_encoding::percent_decode_str;
use tracing::{Instrument, info_span};
use url::Url;

use crate::agent::{Agent, AgentState};
use crate::dump;
use crate::processor::Cleanup;
use crate::transport::{
    ResponseBody, TransportBody, collect_body, default_transport, full_body,
};
use crate::AgentError;

impl Agent {
    /// Execute the request and return the raw response.
    ///
    /// A failed agent returns its stored error without any network activity.
    /// The response status is not inspected here; the decode helpers
    /// ([`Agent::json`], [`Agent::text`], ...) classify non-success statuses.
    ///
    /// Dropping the returned future cancels the round trip. A request
    /// processor's [`Cleanup`] still runs in that case.
    pub async fn send(&mut self) -> Result<Response<ResponseBody>, AgentError> {
        // 1. Sticky error
        if let AgentState::Failed(err) = &self.state {
            return Err(err.clone());
        }

        let url = self
            .url
            .as_ref()
            .map(|u| wire_url(u, &self.query).to_string())
            .unwrap_or_default();
        let span = info_span!(
            "http.request",
            http.method = %self.method,
            http.url = %url,
            otel.kind = "client",
        );
        self.dispatch().instrument(span).await
    }

    async fn dispatch(&mut self) -> Result<Response<ResponseBody>, AgentError> {
        let transport = match &self.transport {
            Some(transport) => transport.clone(),
            None => default_transport()?,
        };

        // 2-7. Content type, wire request, headers, query, auth, cookies
        let mut request = self.assemble()?;

        // 8. Dump the plain request
        if self.debug {
            dump::request(&request);
        }

        // 9. Encrypt the body
        let cipher = self.cipher.clone();
        if let Some(cipher) = &cipher {
            encrypt_request(cipher, &mut request)?;
        }

        // 10. Request processor; its guard is released on every exit below
        let (request, cleanup) = match &self.request_processor {
            Some(processor) => processor.process(request)?,
            None => (request, Cleanup::noop()),
        };

        // 11. Round trip
        let response = transport.round_trip(request).await.inspect_err(|err| {
            tracing::debug!(error = %err, "round trip failed");
        })?;

        // 12. Inbound headers
        self.response_headers = response.headers().clone();

        // 13. Decrypt a body marked as encrypted
        let mut response = response;
        if let Some(cipher) = &cipher {
            if is_cipher_encoded(response.headers()) {
                response = decrypt_response(cipher, response).await?;
                self.response_headers.remove(CIPHER_ENCODED_HEADER);
            }
        }

        // 14. Dump the (plain) response
        if self.debug {
            response = dump::response(response).await?;
        }

        // 15. Response processor
        let result = match &self.response_processor {
            Some(processor) => processor.process(response),
            None => Ok(response),
        };

        // 16. Release
        cleanup.run();
        result
    }

    /// Build the wire request from the accumulated state.
    fn assemble(&self) -> Result<Request<TransportBody>, AgentError> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| AgentError::Url("no target url".to_string()))?;

        // Attached files override whatever body was set
        let (content_type, body) = if self.files.is_empty() {
            (Cow::Borrowed(self.content_type.mime()), self.body.clone())
        } else {
            let multipart = MultipartBody::encode(&self.files);
            (Cow::Owned(multipart.content_type()), multipart.into_body())
        };

        let content_type = HeaderValue::from_str(&content_type)
            .map_err(|e| AgentError::Request(format!("invalid content type: {}", e)))?;
        let body_len = body.len();

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(wire_url(url, &self.query).as_str())
            .body(TransportBody::full(body))?;

        let headers = request.headers_mut();
        headers.extend(self.headers.clone());
        headers.insert(CONTENT_TYPE, content_type);
        set_content_length(headers, body_len);

        if let Some(value) = basic_auth_header(url)? {
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        if !self.cookies.is_empty() {
            let headers = request.headers_mut();
            let mut cookie = self
                .cookies
                .iter()
                .map(|c| c.stripped().to_string())
                .collect::<Vec<_>>()
                .join("; ");
            if let Some(existing) = headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
                cookie = format!("{}; {}", existing, cookie);
            }
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| AgentError::Request(format!("invalid cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        Ok(request)
    }
}

/// The URL as sent: no credentials, no fragment, URL query pairs followed by
/// `extra`.
pub(crate) fn wire_url(url: &Url, extra: &[(String, String)]) -> Url {
    let mut wire = url.clone();
    // Only fails for URLs without a host, which carry no credentials anyway.
    let _ = wire.set_username("");
    let _ = wire.set_password(None);
    wire.set_fragment(None);

    if !extra.is_empty() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .into_owned()
            .chain(extra.iter().cloned())
            .collect();
        wire.query_pairs_mut().clear().extend_pairs(pairs);
    }
    wire
}

/// `Authorization: Basic` from URL userinfo, when a password is present.
fn basic_auth_header(url: &Url) -> Result<Option<HeaderValue>, AgentError> {
    let Some(password) = url.password() else {
        return Ok(None);
    };
    let username = percent_decode_str(url.username()).decode_utf8_lossy();
    let password = percent_decode_str(password).decode_utf8_lossy();

    let encoded = BASE64_STANDARD.encode(format!("{}:{}", username, password));
    let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
        .map_err(|e| AgentError::Request(format!("invalid authorization header: {}", e)))?;
    value.set_sensitive(true);
    Ok(Some(value))
}

fn set_content_length(headers: &mut HeaderMap, len: usize) {
    if len > 0 {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    } else {
        headers.remove(CONTENT_LENGTH);
    }
}

fn encrypt_request(
    cipher: &SharedCipher,
    request: &mut Request<TransportBody>,
) -> Result<(), AgentError> {
    let plain = request.body().as_bytes().cloned().unwrap_or_default();
    let sealed = cipher.encrypt(&plain)?;
    set_content_length(request.headers_mut(), sealed.len());
    *request.body_mut() = TransportBody::full(sealed);
    Ok(())
}

pub(crate) fn is_cipher_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(CIPHER_ENCODED_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

async fn decrypt_response(
    cipher: &SharedCipher,
    response: Response<ResponseBody>,
) -> Result<Response<ResponseBody>, AgentError> {
    let (mut parts, body) = response.into_parts();
    let sealed = collect_body(body).await?;
    let plain = cipher.decrypt(&sealed)?;

    parts.headers.remove(CIPHER_ENCODED_HEADER);
    parts
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(plain.len()));
    Ok(Response::from_parts(parts, full_body(plain)))
}
