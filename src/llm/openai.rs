//! OpenAI-compatible streaming chat completions.

use std::fmt;

use eventsource_stream::Eventsource;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionRequest, Provider, ProviderError, ProviderEvent, ProviderStream};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub seed: Option<u64>,
}

pub struct OpenAiProvider {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete_streaming(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'static, Result<ProviderStream, ProviderError>> {
        let http = self.http.clone();
        let config = self.config.clone();

        async move {
            let body = ChatCompletionBody {
                model: &config.model,
                stream: true,
                messages: &request.messages,
                seed: config.seed,
            };
            let url = format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                CHAT_COMPLETIONS_PATH
            );

            let response = http
                .post(&url)
                .headers(build_headers(&config.api_key))
                .json(&body)
                .send()
                .await
                .map_err(classify_reqwest_error)?;

            let status = response.status();
            if !status.is_success() {
                let error_body = response.text().await.unwrap_or_default();
                return Err(ProviderError::http_status(status.as_u16(), &error_body));
            }

            Ok(parse_sse(response.bytes_stream().eventsource()))
        }
        .boxed()
    }
}

fn build_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Authorization",
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert("accept", HeaderValue::from_static("text/event-stream"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers
}

fn classify_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::network(format!("Connection failed: {e}"))
    } else {
        ProviderError::network(format!("Network error: {e}"))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    stream: bool,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChunkBody {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

struct SseState<E> {
    events: BoxStream<'static, Result<eventsource_stream::Event, E>>,
    text: String,
    done: bool,
}

/// Turn server-sent chat-completion chunks into provider events.
/// `[DONE]` ends the stream with the accumulated text; a connection that
/// closes before it is a `Malformed` error.
fn parse_sse<S, E>(events: S) -> ProviderStream
where
    S: Stream<Item = Result<eventsource_stream::Event, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = SseState {
        events: events.boxed(),
        text: String::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        loop {
            let event = match state.events.next().await {
                Some(Ok(event)) => event,
                None => {
                    state.done = true;
                    let error = ProviderError::malformed("stream ended before [DONE]");
                    return Some((Err(error), state));
                }
                Some(Err(e)) => {
                    state.done = true;
                    let error = ProviderError::network(format!("SSE stream error: {e}"));
                    return Some((Err(error), state));
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                state.done = true;
                let text = std::mem::take(&mut state.text);
                return Some((Ok(ProviderEvent::End(text)), state));
            }

            match serde_json::from_str::<ChunkBody>(data) {
                Ok(body) => {
                    let chunk: String = body
                        .choices
                        .into_iter()
                        .filter_map(|choice| choice.delta.content)
                        .collect();
                    if chunk.is_empty() {
                        continue;
                    }
                    state.text.push_str(&chunk);
                    return Some((Ok(ProviderEvent::Chunk(chunk)), state));
                }
                Err(e) => {
                    state.done = true;
                    let error = ProviderError::malformed(format!("Invalid chunk: {e}"));
                    return Some((Err(error), state));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderErrorKind;

    async fn parse(body: &'static str) -> Vec<Result<ProviderEvent, ProviderError>> {
        let bytes = stream::iter(vec![Ok::<_, std::io::Error>(body)]);
        parse_sse(bytes.eventsource()).collect().await
    }

    #[tokio::test]
    async fn deltas_become_chunks_and_done_ends() {
        let events = parse(concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        ))
        .await;

        assert_eq!(
            events,
            vec![
                Ok(ProviderEvent::Chunk("Hel".into())),
                Ok(ProviderEvent::Chunk("lo".into())),
                Ok(ProviderEvent::End("Hello".into())),
            ]
        );
    }

    #[tokio::test]
    async fn stream_closed_before_done_is_malformed() {
        let events = parse("data: {\"choices\":[{\"delta\":{\"content\":\"half a rep\"}}]}\n\n").await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Ok(ProviderEvent::Chunk("half a rep".into())));
        let err = events[1].as_ref().unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Malformed);
        assert_eq!(err.message, "stream ended before [DONE]");
    }

    /// Serves a fixed SSE body, as a server that drops the connection would
    struct CannedSse(&'static str);

    impl Provider for CannedSse {
        fn name(&self) -> &str {
            "canned"
        }

        fn complete_streaming(
            &self,
            _request: CompletionRequest,
        ) -> BoxFuture<'static, Result<ProviderStream, ProviderError>> {
            let bytes = stream::iter(vec![Ok::<_, std::io::Error>(self.0)]);
            futures::future::ready(Ok(parse_sse(bytes.eventsource()))).boxed()
        }
    }

    #[tokio::test]
    async fn truncated_reply_is_a_stream_error() {
        use crate::event::{bus, Event};
        use crate::llm::StreamingSession;
        use crate::session::Session;
        use std::sync::Arc;

        let (tx, mut rx) = bus(8);
        let provider = CannedSse("data: {\"choices\":[{\"delta\":{\"content\":\"half a rep\"}}]}\n\n");
        let mut streaming = StreamingSession::new(Arc::new(provider), tx);
        let mut session = Session::new("/work");
        session.set_prompt("hi");
        streaming.start(&session);

        assert_eq!(
            rx.recv().await,
            Some(Event::StreamChunk {
                generation: 1,
                text: "half a rep".into()
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(Event::StreamError {
                generation: 1,
                error: "stream ended before [DONE]".into()
            })
        );
    }

    #[tokio::test]
    async fn bad_json_is_malformed() {
        let events = parse("data: {nope\n\ndata: [DONE]\n\n").await;
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].as_ref().unwrap_err().kind,
            ProviderErrorKind::Malformed
        );
    }

    #[test]
    fn body_includes_seed_only_when_set() {
        let messages = vec![ChatMessage::user("hi")];
        let body = ChatCompletionBody {
            model: "gpt-4o",
            stream: true,
            messages: &messages,
            seed: Some(1),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["seed"], 1);
        assert_eq!(json["messages"][0]["role"], "user");

        let body = ChatCompletionBody { seed: None, ..body };
        assert!(serde_json::to_value(&body).unwrap().get("seed").is_none());
    }

    #[test]
    fn auth_header_is_bearer() {
        let headers = build_headers("sk-test");
        assert_eq!(headers["Authorization"], "Bearer sk-test");
    }
}
