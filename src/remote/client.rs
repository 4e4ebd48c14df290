//! Remote test dispatch
//!
//! Sends one `(class, method)` request per unit to a test endpoint running
//! inside another process and maps the reply to an outcome.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

/// Body the remote endpoint returns when the test passed
pub const SUCCESS_SENTINEL: &str = "All tests passed";

/// Remote dispatch errors
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Remote endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to set up remote client: {0}")]
    Setup(String),
}

/// Serialized failure cause sent back by the remote endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePayload {
    #[serde(default)]
    pub kind: Option<String>,
    pub message: String,
    #[serde(default)]
    pub trace: Option<String>,
}

impl fmt::Display for FailurePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{}: {}", kind, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Outcome of one remotely executed unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteOutcome {
    Passed,
    Failed(FailurePayload),
}

impl RemoteOutcome {
    /// Interpret a response body: the sentinel means success, anything else
    /// is a failure payload (JSON if possible, raw text otherwise)
    pub fn from_body(body: &str) -> Self {
        if body.contains(SUCCESS_SENTINEL) {
            return RemoteOutcome::Passed;
        }

        match serde_json::from_str::<FailurePayload>(body) {
            Ok(payload) => RemoteOutcome::Failed(payload),
            Err(_) => RemoteOutcome::Failed(FailurePayload {
                kind: None,
                message: body.trim().to_string(),
                trace: None,
            }),
        }
    }
}

/// Executes a single test method somewhere else
pub trait RemoteDispatcher: Send + Sync {
    fn dispatch(&self, class: &str, method: &str) -> Result<RemoteOutcome, RemoteError>;
}

/// HTTP dispatcher: `GET <endpoint>?class=<class>&method=<method>`
///
/// Requests run on a private single-worker runtime, so `dispatch` blocks the
/// caller without needing (or clashing with) a runtime of its own.
pub struct HttpDispatcher {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
    handle: Handle,
    runtime: Option<Runtime>,
}

impl HttpDispatcher {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RemoteError> {
        Self::with_timeout(endpoint, 30)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::Setup(e.to_string()))?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("remote-dispatch")
            .enable_all()
            .build()
            .map_err(|e| RemoteError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout_secs,
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(
        client: Client,
        endpoint: String,
        timeout_secs: u64,
        class: String,
        method: String,
    ) -> Result<RemoteOutcome, RemoteError> {
        debug!("Dispatching {}.{} to {}", class, method, endpoint);

        let response = client
            .get(&endpoint)
            .query(&[("class", class.as_str()), ("method", method.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout(timeout_secs)
                } else {
                    RemoteError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(RemoteOutcome::from_body(&body))
    }
}

impl RemoteDispatcher for HttpDispatcher {
    fn dispatch(&self, class: &str, method: &str) -> Result<RemoteOutcome, RemoteError> {
        let request = self.handle.spawn(Self::request(
            self.client.clone(),
            self.endpoint.clone(),
            self.timeout_secs,
            class.to_string(),
            method.to_string(),
        ));

        futures::executor::block_on(request)
            .map_err(|e| RemoteError::RequestFailed(e.to_string()))?
    }
}

impl Drop for HttpDispatcher {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serve a single canned HTTP response and report the request line
    fn serve_once(status: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
            }
            tx.send(request_line).unwrap();
            stream.write_all(response.as_bytes()).unwrap();
        });

        (format!("http://{addr}/testrunner"), rx)
    }

    #[test]
    fn test_outcome_from_sentinel() {
        assert_eq!(
            RemoteOutcome::from_body("<html>All tests passed</html>"),
            RemoteOutcome::Passed
        );
    }

    #[test]
    fn test_outcome_from_json_payload() {
        let body = r#"{"kind":"AssertionError","message":"expected 3 authors","trace":"at AuthorTest"}"#;
        match RemoteOutcome::from_body(body) {
            RemoteOutcome::Failed(payload) => {
                assert_eq!(payload.kind.as_deref(), Some("AssertionError"));
                assert_eq!(payload.to_string(), "AssertionError: expected 3 authors");
            }
            RemoteOutcome::Passed => panic!("expected failure"),
        }
    }

    #[test]
    fn test_outcome_from_plain_text() {
        assert_eq!(
            RemoteOutcome::from_body("  NullPointerException\n"),
            RemoteOutcome::Failed(FailurePayload {
                kind: None,
                message: "NullPointerException".to_string(),
                trace: None,
            })
        );
    }

    #[test]
    fn test_http_dispatch_success() {
        let (endpoint, requests) = serve_once("200 OK", SUCCESS_SENTINEL);
        let dispatcher = HttpDispatcher::with_timeout(endpoint, 5).unwrap();

        let outcome = dispatcher.dispatch("AuthorTest", "findAuthors").unwrap();
        assert_eq!(outcome, RemoteOutcome::Passed);

        let request_line = requests.recv().unwrap();
        assert!(request_line.starts_with("GET /testrunner?"));
        assert!(request_line.contains("class=AuthorTest"));
        assert!(request_line.contains("method=findAuthors"));
    }

    #[test]
    fn test_http_dispatch_server_error() {
        let (endpoint, _requests) = serve_once("500 Internal Server Error", "boom");
        let dispatcher = HttpDispatcher::with_timeout(endpoint, 5).unwrap();

        let err = dispatcher.dispatch("AuthorTest", "findAuthors").unwrap_err();
        assert!(matches!(err, RemoteError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_http_dispatch_from_async_context() {
        let (endpoint, _requests) = serve_once("200 OK", SUCCESS_SENTINEL);
        let dispatcher = HttpDispatcher::with_timeout(endpoint, 5).unwrap();

        let outcome = dispatcher.dispatch("AuthorTest", "findAuthors").unwrap();
        assert_eq!(outcome, RemoteOutcome::Passed);
        drop(dispatcher);
    }
}
