//! The request builder.
//!
//! An [`Agent`] accumulates everything needed for one HTTP exchange. Setters
//! consume and return the agent so they chain; [`Agent::send`] and the decode
//! helpers borrow it mutably so the response headers and final state can be
//! inspected afterwards.

use std::borrow::Cow;
use std::sync::Arc;

use api_agent_core::{
    ContentType, File, SharedCipher, encode_form, encode_json, encode_json_html_escaped,
    encode_pb_json, encode_xml,
};
use bytes::Bytes;
use cookie::Cookie;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use prost::Message;
use serde::Serialize;
use url::Url;

use crate::AgentError;
use crate::processor::{RequestProcessor, ResponseProcessor};
use crate::transport::Transport;

/// Whether an agent can still be executed.
///
/// Once a step fails the agent stays [`AgentState::Failed`]: setters become
/// no-ops and [`Agent::send`] returns the stored error without touching the
/// network. [`Agent::reset`] is the only way back to
/// [`AgentState::Building`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AgentState {
    #[default]
    Building,
    Failed(AgentError),
}

/// Fluent HTTP request builder.
///
/// # Example
///
/// ```ignore
/// use api_agent::Agent;
///
/// #[derive(serde::Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// let (status, user) = Agent::get("https://api.example.com/users/7")
///     .header_set("accept", "application/json")
///     .query_add("fields", "name")
///     .json::<User>()
///     .await?;
/// ```
pub struct Agent {
    /// `None` only when the constructor URL failed to parse.
    pub(crate) url: Option<Url>,
    pub(crate) prefix: String,
    pub(crate) method: Method,
    pub(crate) content_type: ContentType,
    pub(crate) headers: HeaderMap,
    pub(crate) response_headers: HeaderMap,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) cookies: Vec<Cookie<'static>>,
    pub(crate) files: Vec<File>,
    pub(crate) body: Bytes,
    pub(crate) cipher: Option<SharedCipher>,
    pub(crate) request_processor: Option<Arc<dyn RequestProcessor>>,
    pub(crate) response_processor: Option<Arc<dyn ResponseProcessor>>,
    pub(crate) transport: Option<Arc<dyn Transport>>,
    pub(crate) state: AgentState,
    pub(crate) debug: bool,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("method", &self.method)
            .field("content_type", &self.content_type)
            .field("query", &self.query)
            .field("files", &self.files.len())
            .field("body_len", &self.body.len())
            .field("cipher", &self.cipher.is_some())
            .field("request_processor", &self.request_processor.is_some())
            .field("response_processor", &self.response_processor.is_some())
            .field("state", &self.state)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Agent {
    /// Create a GET agent for `url`.
    ///
    /// The URL path becomes the [prefix](Agent::prefix). A URL that fails to
    /// parse yields an agent already in the failed state.
    pub fn new(url: impl AsRef<str>) -> Self {
        let (url, state) = match Url::parse(url.as_ref()) {
            Ok(url) => (Some(url), AgentState::Building),
            Err(e) => (None, AgentState::Failed(e.into())),
        };
        let prefix = url
            .as_ref()
            .map(|u| u.path().trim_end_matches('/').to_string())
            .unwrap_or_default();

        Self {
            url,
            prefix,
            method: Method::GET,
            content_type: ContentType::default(),
            headers: HeaderMap::new(),
            response_headers: HeaderMap::new(),
            query: Vec::new(),
            cookies: Vec::new(),
            files: Vec::new(),
            body: Bytes::new(),
            cipher: None,
            request_processor: None,
            response_processor: None,
            transport: None,
            state,
            debug: false,
        }
    }

    pub fn get(url: impl AsRef<str>) -> Self {
        Self::new(url)
    }

    pub fn post(url: impl AsRef<str>) -> Self {
        Self::new(url).method(Method::POST)
    }

    pub fn put(url: impl AsRef<str>) -> Self {
        Self::new(url).method(Method::PUT)
    }

    pub fn patch(url: impl AsRef<str>) -> Self {
        Self::new(url).method(Method::PATCH)
    }

    pub fn head(url: impl AsRef<str>) -> Self {
        Self::new(url).method(Method::HEAD)
    }

    pub fn delete(url: impl AsRef<str>) -> Self {
        Self::new(url).method(Method::DELETE)
    }

    /// GET agent for `http://{host}`.
    pub fn http(host: impl AsRef<str>) -> Self {
        Self::new(format!("http://{}", host.as_ref()))
    }

    /// GET agent for `https://{host}`.
    pub fn https(host: impl AsRef<str>) -> Self {
        Self::new(format!("https://{}", host.as_ref()))
    }
}

// ============================================================================
// State handling
// ============================================================================

impl Agent {
    /// Apply a mutation unless the agent already failed; a mutation error
    /// moves the agent into the failed state.
    fn with<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut Self) -> Result<(), AgentError>,
    {
        if !self.is_failed() {
            if let Err(err) = f(&mut self) {
                self.fail(err);
            }
        }
        self
    }

    /// Record `err` unless an earlier error is already stored.
    pub(crate) fn fail(&mut self, err: AgentError) {
        if !self.is_failed() {
            self.state = AgentState::Failed(err);
        }
    }

    pub(crate) fn url_mut(&mut self) -> Result<&mut Url, AgentError> {
        self.url
            .as_mut()
            .ok_or_else(|| AgentError::Url("no target url".to_string()))
    }

    /// Clear the inbound headers and return to [`AgentState::Building`].
    ///
    /// An agent whose constructor URL never parsed stays failed.
    pub fn reset(&mut self) {
        self.response_headers.clear();
        if self.url.is_some() {
            self.state = AgentState::Building;
        }
    }
}

// ============================================================================
// Setters
// ============================================================================

impl Agent {
    /// Set the request method.
    pub fn method(self, method: Method) -> Self {
        self.with(|a| {
            a.method = method;
            Ok(())
        })
    }

    /// Set the content-type tag without touching the body.
    pub fn content_type(self, content_type: ContentType) -> Self {
        self.with(|a| {
            a.content_type = content_type;
            Ok(())
        })
    }

    /// Set the path prefix used by [`Agent::uri`]. A trailing `/` is dropped.
    pub fn prefix(self, prefix: impl AsRef<str>) -> Self {
        self.with(|a| {
            a.prefix = prefix.as_ref().trim_end_matches('/').to_string();
            Ok(())
        })
    }

    /// Set the URL path to the prefix followed by `uri`.
    pub fn uri(self, uri: impl AsRef<str>) -> Self {
        self.with(|a| {
            let path = format!("{}{}", a.prefix, uri.as_ref());
            a.url_mut()?.set_path(&path);
            Ok(())
        })
    }

    /// Set the URL fragment. An empty value removes it.
    pub fn fragment(self, fragment: impl AsRef<str>) -> Self {
        self.with(|a| {
            let fragment = fragment.as_ref();
            a.url_mut()?
                .set_fragment((!fragment.is_empty()).then_some(fragment));
            Ok(())
        })
    }

    /// Replace every added value of `key` with `value`.
    ///
    /// Query pairs written in the constructor URL are not affected.
    pub fn query_set(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(|a| {
            let key = key.into();
            a.query.retain(|(k, _)| *k != key);
            a.query.push((key, value.into()));
            Ok(())
        })
    }

    /// Add a query pair. Keys may repeat.
    pub fn query_add(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(|a| {
            a.query.push((key.into(), value.into()));
            Ok(())
        })
    }

    /// Remove every added value of `key`.
    ///
    /// Query pairs written in the constructor URL are kept.
    pub fn query_del(self, key: impl AsRef<str>) -> Self {
        self.with(|a| {
            a.query.retain(|(k, _)| k != key.as_ref());
            Ok(())
        })
    }

    /// Merge `headers` into the outbound headers, keeping existing values.
    pub fn headers(self, headers: HeaderMap) -> Self {
        self.with(|a| {
            let mut last = None;
            for (name, value) in headers {
                // Iteration yields the name only on its first value.
                if let Some(name) = name {
                    last = Some(name);
                }
                if let Some(name) = &last {
                    a.headers.append(name.clone(), value);
                }
            }
            Ok(())
        })
    }

    /// Set an outbound header, replacing previous values.
    ///
    /// An invalid name or value fails the agent.
    pub fn header_set<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.with(|a| {
            let (name, value) = header_pair(key, value)?;
            a.headers.insert(name, value);
            Ok(())
        })
    }

    /// Append an outbound header value.
    pub fn header_add<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.with(|a| {
            let (name, value) = header_pair(key, value)?;
            a.headers.append(name, value);
            Ok(())
        })
    }

    /// Remove every value of an outbound header.
    pub fn header_del(self, key: impl AsRef<str>) -> Self {
        self.with(|a| {
            if let Ok(name) = HeaderName::from_bytes(key.as_ref().as_bytes()) {
                a.headers.remove(name);
            }
            Ok(())
        })
    }

    /// Store credentials in the URL userinfo; they are sent as
    /// `Authorization: Basic`.
    pub fn basic_auth(self, username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        self.with(|a| {
            let url = a.url_mut()?;
            url.set_username(username.as_ref())
                .and_then(|()| url.set_password(Some(password.as_ref())))
                .map_err(|()| AgentError::Url("url cannot carry credentials".to_string()))
        })
    }

    /// Remove credentials from the URL.
    pub fn basic_auth_clear(self) -> Self {
        self.with(|a| {
            let url = a.url_mut()?;
            // Both only fail for URLs that cannot hold credentials at all.
            let _ = url.set_username("");
            let _ = url.set_password(None);
            Ok(())
        })
    }

    /// Append cookies, keeping insertion order.
    pub fn cookies<I>(self, cookies: I) -> Self
    where
        I: IntoIterator<Item = Cookie<'static>>,
    {
        self.with(|a| {
            a.cookies.extend(cookies);
            Ok(())
        })
    }

    /// Append a single `name=value` cookie.
    pub fn cookie(
        self,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.cookies([Cookie::new(name, value)])
    }

    /// Log request and response dumps under the `api_agent::dump` target.
    pub fn debug(self, enabled: bool) -> Self {
        self.with(|a| {
            a.debug = enabled;
            Ok(())
        })
    }

    /// Encrypt outgoing bodies and decrypt responses marked with
    /// `x-cipher-encoded: true`.
    pub fn cipher(self, cipher: impl Into<SharedCipher>) -> Self {
        self.with(|a| {
            a.cipher = Some(cipher.into());
            Ok(())
        })
    }

    /// Install the request processor, replacing any previous one.
    pub fn request_processor<P: RequestProcessor>(self, processor: P) -> Self {
        self.shared_request_processor(Arc::new(processor))
    }

    /// Install a shared request processor, replacing any previous one.
    pub fn shared_request_processor(self, processor: Arc<dyn RequestProcessor>) -> Self {
        self.with(|a| {
            a.request_processor = Some(processor);
            Ok(())
        })
    }

    /// Install the response processor, replacing any previous one.
    pub fn response_processor<P: ResponseProcessor>(self, processor: P) -> Self {
        self.shared_response_processor(Arc::new(processor))
    }

    /// Install a shared response processor, replacing any previous one.
    pub fn shared_response_processor(self, processor: Arc<dyn ResponseProcessor>) -> Self {
        self.with(|a| {
            a.response_processor = Some(processor);
            Ok(())
        })
    }

    /// Send through `transport` instead of the process-wide default.
    pub fn transport(self, transport: Arc<dyn Transport>) -> Self {
        self.with(|a| {
            a.transport = Some(transport);
            Ok(())
        })
    }
}

fn header_pair<K, V>(key: K, value: V) -> Result<(HeaderName, HeaderValue), AgentError>
where
    HeaderName: TryFrom<K>,
    <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
    HeaderValue: TryFrom<V>,
    <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
{
    let invalid = |e: http::Error| AgentError::Encode(format!("invalid header: {}", e));
    let name = HeaderName::try_from(key).map_err(|e| invalid(e.into()))?;
    let value = HeaderValue::try_from(value).map_err(|e| invalid(e.into()))?;
    Ok((name, value))
}

// ============================================================================
// Body setters
// ============================================================================

impl Agent {
    fn set_body(&mut self, body: Bytes, content_type: ContentType) {
        self.body = body;
        self.content_type = content_type;
    }

    /// Use `application/x-www-form-urlencoded` pairs as the body.
    pub fn form_data<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.with(|a| {
            a.set_body(encode_form(pairs), ContentType::Form);
            Ok(())
        })
    }

    /// Use `value` encoded as JSON as the body.
    pub fn json_data<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.with(|a| {
            a.set_body(encode_json(value)?, ContentType::Json);
            Ok(())
        })
    }

    /// Like [`Agent::json_data`], with `<`, `>` and `&` escaped as unicode
    /// sequences inside strings.
    pub fn json_data_html_escaped<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.with(|a| {
            a.set_body(encode_json_html_escaped(value)?, ContentType::Json);
            Ok(())
        })
    }

    /// Use `value` encoded as XML as the body.
    pub fn xml_data<T: Serialize>(self, value: &T) -> Self {
        self.with(|a| {
            a.set_body(encode_xml(value)?, ContentType::Xml);
            Ok(())
        })
    }

    /// Use a protobuf message in its JSON mapping as the body.
    pub fn pb_data<T: Message + Serialize>(self, message: &T) -> Self {
        self.with(|a| {
            a.set_body(encode_pb_json(message)?, ContentType::Json);
            Ok(())
        })
    }

    /// Attach files. Any attached file makes the request multipart, whatever
    /// body was set. An empty list leaves the body and its tag untouched.
    pub fn file_data<I>(self, files: I) -> Self
    where
        I: IntoIterator<Item = File>,
    {
        self.with(|a| {
            a.files.extend(files);
            if !a.files.is_empty() {
                a.content_type = ContentType::Multipart;
            }
            Ok(())
        })
    }

    /// Use raw bytes as the body.
    pub fn body(self, body: impl Into<Bytes>, content_type: ContentType) -> Self {
        self.with(|a| {
            a.set_body(body.into(), content_type);
            Ok(())
        })
    }
}

// ============================================================================
// Getters
// ============================================================================

impl Agent {
    pub fn current_method(&self) -> &Method {
        &self.method
    }

    pub fn current_content_type(&self) -> ContentType {
        self.content_type
    }

    /// The target URL, `None` when the constructor URL failed to parse.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Query pairs that will be sent: those of the URL followed by the added
    /// ones.
    pub fn query(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .url
            .iter()
            .flat_map(|u| u.query_pairs().into_owned())
            .collect();
        pairs.extend(self.query.iter().cloned());
        pairs
    }

    /// Outbound headers.
    pub fn request_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Headers of the last response.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// The stored error, if the agent failed.
    pub fn error(&self) -> Option<&AgentError> {
        match &self.state {
            AgentState::Failed(err) => Some(err),
            AgentState::Building => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, AgentState::Failed(_))
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }
}
