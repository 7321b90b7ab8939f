//! Client for the chat collaborator that sits beside the background.
//!
//! The backend accepts `POST <endpoint>/get` with `{"msg": "..."}` and answers
//! `{"reply": "..."}`. Failures never propagate to the caller as errors; they
//! become a user-visible [`ChatOutcome::Notice`] and nothing is retried.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";
pub const EMPTY_MESSAGE_NOTICE: &str = "Please enter a message.";
pub const CONNECTION_NOTICE: &str = "Error connecting to chatbot.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid chat endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// A reply stamped with the local `HH:MM` it arrived at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Reply(ChatMessage),
    Notice(String),
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub endpoint: Url,
    pub timeout: Duration,
}

impl ChatConfig {
    pub fn new(endpoint: &str) -> Result<Self, ChatError> {
        let invalid = |reason: String| ChatError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };
        let endpoint_url = Url::parse(endpoint.trim()).map_err(|err| invalid(err.to_string()))?;
        if endpoint_url.cannot_be_a_base() {
            return Err(invalid("endpoint cannot carry a path".to_string()));
        }
        Ok(Self {
            endpoint: endpoint_url,
            timeout: Duration::from_secs(30),
        })
    }

    /// `<endpoint>/get`, keeping any path prefix on the endpoint.
    pub fn reply_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("get");
        }
        url
    }
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Sends one message. Blank input is rejected locally without a request.
    pub fn send(&self, message: &str) -> ChatOutcome {
        if message.trim().is_empty() {
            return ChatOutcome::Notice(EMPTY_MESSAGE_NOTICE.to_string());
        }

        match self.exchange(message) {
            Ok(reply) => ChatOutcome::Reply(ChatMessage {
                text: reply.reply,
                timestamp: chrono::Local::now().format("%H:%M").to_string(),
            }),
            Err(err) => {
                warn!(error = %err, "chat request failed");
                ChatOutcome::Notice(CONNECTION_NOTICE.to_string())
            }
        }
    }

    fn exchange(&self, message: &str) -> Result<ChatReply, reqwest::Error> {
        let url = self.config.reply_url();
        debug!(%url, chars = message.chars().count(), "sending chat message");
        let request = ChatRequest {
            msg: message.to_string(),
        };
        self.http
            .post(url)
            .json(&request)
            .send()?
            .error_for_status()?
            .json::<ChatReply>()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use super::*;

    /// Serves one HTTP response and hands back the raw request it received.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut request = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header");
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().expect("content length");
                }
                request.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut body_bytes = vec![0; content_length];
            reader.read_exact(&mut body_bytes).expect("read body");
            request.push_str(&String::from_utf8_lossy(&body_bytes));

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).expect("write response");
            request
        });
        (endpoint, handle)
    }

    fn client(endpoint: &str) -> ChatClient {
        ChatClient::new(ChatConfig::new(endpoint).expect("endpoint")).expect("client")
    }

    #[test]
    fn blank_message_is_rejected_locally() {
        let client = client("http://127.0.0.1:1");
        assert_eq!(
            client.send("   \n"),
            ChatOutcome::Notice(EMPTY_MESSAGE_NOTICE.to_string())
        );
    }

    #[test]
    fn unreachable_backend_becomes_a_notice() {
        let client = client("http://127.0.0.1:1");
        assert_eq!(
            client.send("hello"),
            ChatOutcome::Notice(CONNECTION_NOTICE.to_string())
        );
    }

    #[test]
    fn reply_is_returned_with_a_timestamp() {
        let (endpoint, server) = serve_once("200 OK", r#"{"reply":"Hi there."}"#);
        let outcome = client(&endpoint).send("hello");
        let request = server.join().expect("stub server");

        assert!(request.starts_with("POST /get "), "{request}");
        assert!(request.ends_with(r#"{"msg":"hello"}"#), "{request}");
        match outcome {
            ChatOutcome::Reply(message) => {
                assert_eq!(message.text, "Hi there.");
                let (hours, minutes) = message.timestamp.split_once(':').expect("HH:MM");
                assert_eq!(hours.len(), 2);
                assert_eq!(minutes.len(), 2);
                assert!(hours.parse::<u8>().unwrap() < 24);
                assert!(minutes.parse::<u8>().unwrap() < 60);
            }
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[test]
    fn malformed_reply_becomes_a_notice() {
        let (endpoint, server) = serve_once("200 OK", r#"{"answer":"wrong field"}"#);
        let outcome = client(&endpoint).send("hello");
        server.join().expect("stub server");
        assert_eq!(outcome, ChatOutcome::Notice(CONNECTION_NOTICE.to_string()));
    }

    #[test]
    fn reply_url_keeps_endpoint_prefix() {
        let config = ChatConfig::new("http://example.test/api/").unwrap();
        assert_eq!(config.reply_url().as_str(), "http://example.test/api/get");
        let config = ChatConfig::new("http://example.test:5000").unwrap();
        assert_eq!(config.reply_url().as_str(), "http://example.test:5000/get");
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        assert!(matches!(
            ChatConfig::new("not a url"),
            Err(ChatError::InvalidEndpoint { .. })
        ));
        assert!(ChatConfig::new("mailto:someone@example.test").is_err());
    }
}
