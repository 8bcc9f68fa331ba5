use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt};

use super::{CompletionRequest, Provider, ProviderError, ProviderEvent, ProviderStream};

/// Scripted provider for tests and offline use
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    chunks: Vec<String>,
    /// Reply with the prompt, word by word, instead of `chunks`
    echo: bool,
    delay: Duration,
    fail_to_open: Option<ProviderError>,
    fail_after: Option<(usize, ProviderError)>,
    omit_end: bool,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Wait this long before every chunk
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail before any chunk is produced
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.fail_to_open = Some(error);
        self
    }

    /// Yield `after` chunks, then fail
    pub fn failing_after(mut self, after: usize, error: ProviderError) -> Self {
        self.fail_after = Some((after, error));
        self
    }

    /// Close the stream without an explicit end event, as a dropped connection would
    pub fn without_end(mut self) -> Self {
        self.omit_end = true;
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn script(&self, request: &CompletionRequest) -> Vec<Result<ProviderEvent, ProviderError>> {
        let chunks: Vec<String> = if self.echo {
            request
                .messages
                .last()
                .map(|m| m.content.split_inclusive(' ').map(str::to_string).collect())
                .unwrap_or_default()
        } else {
            self.chunks.clone()
        };

        let mut script = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if let Some((after, error)) = &self.fail_after
                && *after == i
            {
                script.push(Err(error.clone()));
                return script;
            }
            script.push(Ok(ProviderEvent::Chunk(chunk.clone())));
        }

        if let Some((_, error)) = &self.fail_after {
            script.push(Err(error.clone()));
        } else if !self.omit_end {
            script.push(Ok(ProviderEvent::End(chunks.concat())));
        }
        script
    }
}

impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete_streaming(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'static, Result<ProviderStream, ProviderError>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(error) = self.fail_to_open.clone() {
            return futures::future::ready(Err(error)).boxed();
        }

        let delay = self.delay;
        let events = stream::iter(self.script(&request)).then(move |event| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            event
        });

        futures::future::ready(Ok(events.boxed())).boxed()
    }
}
