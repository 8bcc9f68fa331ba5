//! Language-model providers and the streaming session that drives them.

pub mod mock;
pub mod openai;
pub mod streaming;

use std::fmt;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::session::Session;

pub use mock::MockProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use streaming::{CancelHandle, StreamingSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
}

/// The context message followed by the prompt, both as user turns.
/// Reads every file item, so this runs off the application loop.
pub async fn build_request(session: &Session) -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            ChatMessage::user(session.context_message().await),
            ChatMessage::user(session.prompt()),
        ],
    }
}

/// What a provider stream yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    Chunk(String),
    /// Completion finished; carries the full reply text
    End(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Could not reach the endpoint or the connection dropped
    Network,
    HttpStatus,
    /// The endpoint answered with something we could not parse
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Malformed, message)
    }

    /// Non-success response. Uses the API's `error.message` when the body has one.
    pub fn http_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                json.get("error")?
                    .get("message")?
                    .as_str()
                    .map(str::to_string)
            });

        let message = match detail {
            Some(detail) => format!("HTTP {status}: {detail}"),
            None => format!("HTTP {status}"),
        };
        Self::new(ProviderErrorKind::HttpStatus, message)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

pub type ProviderStream = BoxStream<'static, Result<ProviderEvent, ProviderError>>;

/// A streaming chat-completion backend
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn complete_streaming(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'static, Result<ProviderStream, ProviderError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_has_context_then_prompt() {
        let mut session = Session::new("/work");
        session.add_context_text("ctx");
        session.set_prompt("question");

        let request = build_request(&session).await;
        assert_eq!(
            request.messages,
            vec![ChatMessage::user("ctx\n\n"), ChatMessage::user("question")]
        );
    }

    #[test]
    fn http_status_extracts_api_message() {
        let err = ProviderError::http_status(401, r#"{"error":{"message":"bad key"}}"#);
        assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
        assert_eq!(err.to_string(), "HTTP 401: bad key");

        assert_eq!(ProviderError::http_status(502, "<html>").to_string(), "HTTP 502");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
