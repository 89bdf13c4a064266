//! Typed response helpers.
//!
//! Each helper calls [`Agent::send`] once. A non-success status becomes
//! [`AgentError::Status`] carrying the trimmed response body (or the
//! canonical reason phrase when the body is empty); a success body that does
//! not decode becomes [`AgentError::Decode`]. Any failure is also stored on
//! the agent, which stays failed until [`Agent::reset`].

use api_agent_core::{decode_json, decode_pb_json, decode_xml};
use bytes::Bytes;
use http::StatusCode;
use prost::Message;
use serde::de::DeserializeOwned;

use crate::AgentError;
use crate::agent::Agent;
use crate::transport::collect_body;

impl Agent {
    /// Send and return the status code and status line (`"200 OK"`).
    ///
    /// Any response counts as success here, whatever its status.
    pub async fn status(&mut self) -> Result<(StatusCode, String), AgentError> {
        let result = self.send().await.map(|response| {
            let status = response.status();
            (status, status.to_string())
        });
        self.record(result)
    }

    /// Send and return the raw body of a success response.
    pub async fn bytes(&mut self) -> Result<(StatusCode, Bytes), AgentError> {
        let result = self.fetch().await;
        self.record(result)
    }

    /// Send and return the body of a success response as text.
    ///
    /// Invalid UTF-8 sequences are replaced.
    pub async fn text(&mut self) -> Result<(StatusCode, String), AgentError> {
        let (status, body) = self.bytes().await?;
        Ok((status, String::from_utf8_lossy(&body).into_owned()))
    }

    /// Send and decode a JSON body.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<(StatusCode, T), AgentError> {
        let result = self.fetch().await.and_then(|(status, body)| {
            decode_json(&body)
                .map(|value| (status, value))
                .map_err(|e| AgentError::decode(status, e))
        });
        self.record(result)
    }

    /// Send and decode an XML body.
    pub async fn xml<T: DeserializeOwned>(&mut self) -> Result<(StatusCode, T), AgentError> {
        let result = self.fetch().await.and_then(|(status, body)| {
            decode_xml(&body)
                .map(|value| (status, value))
                .map_err(|e| AgentError::decode(status, e))
        });
        self.record(result)
    }

    /// Send and decode a protobuf message from its JSON mapping.
    ///
    /// An empty body yields the default message.
    pub async fn json_pb<T>(&mut self) -> Result<(StatusCode, T), AgentError>
    where
        T: Message + DeserializeOwned + Default,
    {
        let result = self.fetch().await.and_then(|(status, body)| {
            decode_pb_json(&body)
                .map(|value| (status, value))
                .map_err(|e| AgentError::decode(status, e))
        });
        self.record(result)
    }

    /// Send, buffer the body and classify the status.
    async fn fetch(&mut self) -> Result<(StatusCode, Bytes), AgentError> {
        let response = self.send().await?;
        let status = response.status();
        let body = collect_body(response.into_body()).await;

        if !status.is_success() {
            return Err(AgentError::status_error(status, status_message(status, body.ok())));
        }
        Ok((status, body?))
    }

    fn record<T>(&mut self, result: Result<T, AgentError>) -> Result<T, AgentError> {
        if let Err(err) = &result {
            self.fail(err.clone());
        }
        result
    }
}

fn status_message(status: StatusCode, body: Option<Bytes>) -> String {
    body.map(|b| String::from_utf8_lossy(&b).trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use http::Response;
    use serde::{Deserialize, Serialize};

    use crate::AgentState;
    use crate::testing::StubTransport;
    use crate::transport::full_body;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Pair {
        k: String,
    }

    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    struct Counter {
        #[prost(string, tag = "1")]
        #[serde(default)]
        name: String,
        #[prost(int64, tag = "2")]
        #[serde(default)]
        count: i64,
    }

    fn agent(url: &str, transport: StubTransport) -> (Agent, Arc<StubTransport>) {
        let stub = Arc::new(transport);
        (Agent::get(url).transport(stub.clone()), stub)
    }

    #[tokio::test]
    async fn test_json_post_round_trip() {
        let stub = Arc::new(StubTransport::echo_body());
        let (status, pair) = Agent::post("http://x/pairs")
            .json_data(&Pair { k: "v".into() })
            .transport(stub.clone())
            .json::<Pair>()
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(pair.k, "v");
        assert_eq!(stub.last().body, Bytes::from_static(br#"{"k":"v"}"#));
    }

    #[tokio::test]
    async fn test_not_found_is_not_decoded() {
        let (mut agent, _) = agent("http://x/missing", StubTransport::reply(404, "not found"));
        let err = agent.json::<Pair>().await.unwrap_err();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            err,
            AgentError::status_error(StatusCode::NOT_FOUND, "not found")
        );
        assert_eq!(agent.state(), &AgentState::Failed(err));
    }

    #[tokio::test]
    async fn test_empty_error_body_uses_reason_phrase() {
        let (mut agent, _) = agent("http://x/", StubTransport::reply(503, "  \n"));
        let err = agent.bytes().await.unwrap_err();
        assert_eq!(
            err,
            AgentError::status_error(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
        );
    }

    #[tokio::test]
    async fn test_decode_error_keeps_status() {
        let (mut agent, _) = agent("http://x/", StubTransport::reply(200, "<html>"));
        let err = agent.json::<Pair>().await.unwrap_err();
        assert!(matches!(err, AgentError::Decode { status, .. } if status == StatusCode::OK));
    }

    #[tokio::test]
    async fn test_failure_is_sticky_until_reset() {
        let (mut agent, stub) = agent("http://x/", StubTransport::reply(500, "boom"));
        let first = agent.text().await.unwrap_err();
        let second = agent.text().await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(stub.calls(), 1);

        agent.reset();
        agent.text().await.unwrap_err();
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_reports_internal_status() {
        let (mut agent, _) = agent("http://x/", StubTransport::failing("dns failure"));
        let err = agent.status().await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err, AgentError::Transport("dns failure".into()));
    }

    #[tokio::test]
    async fn test_status_line() {
        let (mut agent, _) = agent("http://x/", StubTransport::reply(404, "gone"));
        let (status, line) = agent.status().await.unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(line, "404 Not Found");
    }

    #[tokio::test]
    async fn test_text_and_bytes() {
        let (mut agent, _) = agent("http://x/", StubTransport::reply(200, "héllo"));
        let (status, text) = agent.text().await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "héllo");

        let (mut agent, _) = self::agent("http://x/", StubTransport::reply(204, ""));
        let (status, body) = agent.bytes().await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_xml() {
        let (mut agent, _) = agent(
            "http://x/",
            StubTransport::reply(200, "<Pair><k>v</k></Pair>"),
        );
        let (_, pair) = agent.xml::<Pair>().await.unwrap();
        assert_eq!(pair, Pair { k: "v".into() });
    }

    #[tokio::test]
    async fn test_json_pb() {
        let (mut agent, _) = agent(
            "http://x/",
            StubTransport::reply(200, r#"{"name":"hits","count":3}"#),
        );
        let (_, counter) = agent.json_pb::<Counter>().await.unwrap();
        assert_eq!(counter.name, "hits");
        assert_eq!(counter.count, 3);

        let (mut agent, _) = self::agent("http://x/", StubTransport::reply(200, ""));
        let (_, counter) = agent.json_pb::<Counter>().await.unwrap();
        assert_eq!(counter, Counter::default());
    }

    #[tokio::test]
    async fn test_response_processor_result_is_decoded() {
        let (agent, _) = agent("http://x/", StubTransport::reply(200, r#"{"k":"raw"}"#));
        let (_, pair) = agent
            .response_processor(
                |resp: Response<crate::ResponseBody>| -> Result<_, AgentError> {
                    Ok(resp.map(|_| full_body(r#"{"k":"rewritten"}"#)))
                },
            )
            .json::<Pair>()
            .await
            .unwrap();
        assert_eq!(pair.k, "rewritten");
    }
}
