//! Owns the single live completion and relays its output onto the event bus.
//!
//! Every `start` gets a fresh generation. The relay task tags each event with
//! it, so the application can drop anything from a stream it has moved past.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{build_request, Provider, ProviderError, ProviderEvent};
use crate::event::{Event, EventSender, Generation};
use crate::session::Session;

/// Cancels one stream. Cloning shares the same token.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    generation: Generation,
    token: CancellationToken,
}

impl CancelHandle {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct StreamingSession {
    provider: Arc<dyn Provider>,
    sink: EventSender,
    last_generation: Generation,
    current: Option<CancelHandle>,
}

impl StreamingSession {
    pub fn new(provider: Arc<dyn Provider>, sink: EventSender) -> Self {
        Self {
            provider,
            sink,
            last_generation: 0,
            current: None,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Start a completion for `session`, cancelling whatever was running.
    /// Returns at once: context files are read by the relay task.
    pub fn start(&mut self, session: &Session) -> CancelHandle {
        self.cancel();

        self.last_generation += 1;
        let handle = CancelHandle {
            generation: self.last_generation,
            token: CancellationToken::new(),
        };

        info!(
            generation = handle.generation,
            provider = self.provider.name(),
            context_items = session.context().len(),
            "starting completion"
        );

        tokio::spawn(relay(
            handle.generation,
            Arc::clone(&self.provider),
            session.clone(),
            handle.token.clone(),
            self.sink.clone(),
        ));

        self.current = Some(handle.clone());
        handle
    }

    /// Cancel the live stream, if any. Its relay reports `Cancelled`.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            debug!(generation = handle.generation, "cancelling completion");
            handle.cancel();
        }
    }

    /// Retire `generation` after its terminal event. Returns false for stale generations.
    pub fn finish(&mut self, generation: Generation) -> bool {
        match &self.current {
            Some(handle) if handle.generation == generation => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn live_generation(&self) -> Option<Generation> {
        self.current.as_ref().map(CancelHandle::generation)
    }

    pub fn is_streaming(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Drives one provider stream and emits exactly one terminal event.
/// Cancellation wins at every await, including while context files are read.
async fn relay(
    generation: Generation,
    provider: Arc<dyn Provider>,
    session: Session,
    token: CancellationToken,
    sink: EventSender,
) {
    let terminal = tokio::select! {
        biased;
        _ = token.cancelled() => Event::Cancelled { generation },
        terminal = pump(generation, provider, session, &sink) => terminal,
    };

    match &terminal {
        Event::StreamError { error, .. } => warn!(generation, %error, "completion failed"),
        other => info!(generation, outcome = other.name(), "completion finished"),
    }
    sink.send(terminal).await;
}

async fn pump(
    generation: Generation,
    provider: Arc<dyn Provider>,
    session: Session,
    sink: &EventSender,
) -> Event {
    let request = build_request(&session).await;
    let mut stream = match provider.complete_streaming(request).await {
        Ok(stream) => stream,
        Err(e) => return stream_error(generation, e),
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(ProviderEvent::Chunk(chunk)) => {
                sink.send(Event::StreamChunk {
                    generation,
                    text: chunk,
                })
                .await;
            }
            Ok(ProviderEvent::End(final_text)) => {
                return Event::StreamEnd {
                    generation,
                    final_text,
                };
            }
            Err(e) => return stream_error(generation, e),
        }
    }

    // A reply is only complete once the provider says so
    stream_error(
        generation,
        ProviderError::malformed("provider stream ended before the reply was complete"),
    )
}

fn stream_error(generation: Generation, error: ProviderError) -> Event {
    Event::StreamError {
        generation,
        error: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::bus;
    use crate::llm::MockProvider;
    use std::time::Duration;

    #[tokio::test]
    async fn generations_increase_per_start() {
        let (tx, _rx) = bus(64);
        let provider = Arc::new(MockProvider::new(["a"]).with_delay(Duration::from_secs(5)));
        let mut streaming = StreamingSession::new(provider, tx);
        let session = Session::new("/work");

        let first = streaming.start(&session);
        let second = streaming.start(&session);
        assert_eq!(first.generation(), 1);
        assert_eq!(second.generation(), 2);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(streaming.live_generation(), Some(2));
    }

    #[tokio::test]
    async fn finish_ignores_stale_generation() {
        let (tx, _rx) = bus(64);
        let provider = Arc::new(MockProvider::new(["a"]).with_delay(Duration::from_secs(5)));
        let mut streaming = StreamingSession::new(provider, tx);
        let session = Session::new("/work");

        streaming.start(&session);
        streaming.start(&session);
        assert!(!streaming.finish(1));
        assert!(streaming.is_streaming());
        assert!(streaming.finish(2));
        assert!(!streaming.is_streaming());
    }

    #[tokio::test]
    async fn cancel_without_stream_is_a_noop() {
        let (tx, _rx) = bus(4);
        let mut streaming = StreamingSession::new(Arc::new(MockProvider::new(["a"])), tx);
        streaming.cancel();
        streaming.cancel();
        assert_eq!(streaming.live_generation(), None);
    }
}
