mod common;

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::next_event;
use mark::event::{self, Event, EventReceiver};
use mark::llm::{MockProvider, ProviderError, Role, StreamingSession};
use mark::session::Session;
use tempfile::TempDir;

fn streaming(provider: MockProvider) -> (StreamingSession, EventReceiver) {
    let (sink, bus) = event::bus(event::DEFAULT_BUS_CAPACITY);
    (StreamingSession::new(Arc::new(provider), sink), bus)
}

/// Collect events until the terminal event of `generation`
async fn collect_until_terminal(bus: &mut EventReceiver, generation: u64) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = next_event(bus).await;
        let done = event.is_stream_terminal() && event.generation() == Some(generation);
        events.push(event);
        if done {
            return events;
        }
    }
}

#[tokio::test]
async fn test_request_has_context_then_prompt() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();

    let provider = MockProvider::new(["ok"]);
    let recorder = provider.clone();
    let (mut streaming, mut bus) = streaming(provider);

    let mut session = Session::new(dir.path());
    session.add_context_text("Be brief.");
    session.add_context_file("main.rs");
    session.add_context_file("missing.rs");
    session.set_prompt("Explain this");

    let handle = streaming.start(&session);
    collect_until_terminal(&mut bus, handle.generation()).await;

    let requests = recorder.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.role == Role::User));
    assert_eq!(
        messages[0].content,
        "Be brief.\n\n\
         File: main.rs\n```\nfn main() {}\n```\n\n\n\
         File: missing.rs\nFile does not exist.\n\n\n"
    );
    assert_eq!(messages[1].content, "Explain this");
}

#[tokio::test]
async fn test_file_contents_are_read_at_run_time() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "old\n").unwrap();

    let provider = MockProvider::new(["ok"]);
    let recorder = provider.clone();
    let (mut streaming, mut bus) = streaming(provider);

    let mut session = Session::new(dir.path());
    session.add_context_file(&path);
    fs::write(&path, "new\n").unwrap();
    session.set_prompt("go");

    let handle = streaming.start(&session);
    collect_until_terminal(&mut bus, handle.generation()).await;

    let context = &recorder.requests()[0].messages[0].content;
    assert!(context.contains("new\n"));
    assert!(!context.contains("old"));
}

/// A context file that never finishes reading does not hold up `start`,
/// and cancelling still ends the stream
#[tokio::test]
async fn test_blocked_context_file_does_not_block_start() {
    let dir = TempDir::new().unwrap();
    let fifo = dir.path().join("pipe");
    let status = std::process::Command::new("mkfifo").arg(&fifo).status().unwrap();
    assert!(status.success());

    let provider = MockProvider::new(["never sent"]);
    let recorder = provider.clone();
    let (mut streaming, mut bus) = streaming(provider);
    let mut session = Session::new(dir.path());
    session.add_context_file("pipe");
    session.set_prompt("hi");

    let started = Instant::now();
    let handle = streaming.start(&session);
    assert!(started.elapsed() < Duration::from_secs(1));

    // Nobody writes to the pipe, so the request is never built
    let nothing = tokio::time::timeout(Duration::from_millis(100), bus.recv()).await;
    assert!(nothing.is_err(), "no event expected");
    assert!(recorder.requests().is_empty());

    streaming.cancel();
    assert_eq!(
        next_event(&mut bus).await,
        Event::Cancelled { generation: handle.generation() }
    );
    assert!(recorder.requests().is_empty());

    // Give the abandoned read its EOF so the runtime can shut down
    drop(fs::OpenOptions::new().write(true).open(&fifo).unwrap());
}

/// Starting again cancels the first stream; each generation ends exactly once
#[tokio::test]
async fn test_restart_cancels_previous_stream() {
    let provider = MockProvider::new(["a", "b", "c"]).with_delay(Duration::from_millis(30));
    let (mut streaming, mut bus) = streaming(provider);
    let mut session = Session::new("/tmp");
    session.set_prompt("hi");

    let first = streaming.start(&session);
    let second = streaming.start(&session);
    assert!(first.is_cancelled());
    assert!(!second.is_cancelled());
    assert_eq!(second.generation(), first.generation() + 1);
    assert_eq!(streaming.live_generation(), Some(second.generation()));

    let events = collect_until_terminal(&mut bus, second.generation()).await;
    let terminals: Vec<&Event> = events.iter().filter(|e| e.is_stream_terminal()).collect();
    assert_eq!(
        terminals,
        vec![
            &Event::Cancelled { generation: first.generation() },
            &Event::StreamEnd { generation: second.generation(), final_text: "abc".into() },
        ]
    );
    assert!(
        events
            .iter()
            .filter(|e| matches!(e, Event::StreamChunk { .. }))
            .all(|e| e.generation() == Some(second.generation())),
        "the cancelled stream produced no chunks"
    );
}

#[tokio::test]
async fn test_cancel_when_idle_emits_nothing() {
    let (mut streaming, mut bus) = streaming(MockProvider::echo());

    streaming.cancel();
    assert!(!streaming.is_streaming());

    let nothing = tokio::time::timeout(Duration::from_millis(50), bus.recv()).await;
    assert!(nothing.is_err(), "no event expected");
}

#[tokio::test]
async fn test_finish_only_retires_live_generation() {
    let (mut streaming, mut bus) = streaming(MockProvider::new(["x"]));
    let mut session = Session::new("/tmp");
    session.set_prompt("hi");

    let handle = streaming.start(&session);
    collect_until_terminal(&mut bus, handle.generation()).await;

    assert!(!streaming.finish(handle.generation() + 1));
    assert!(streaming.is_streaming());
    assert!(streaming.finish(handle.generation()));
    assert!(!streaming.is_streaming());
}

#[tokio::test]
async fn test_provider_error_mid_stream() {
    let provider = MockProvider::new(["partial", "never"])
        .failing_after(1, ProviderError::malformed("bad chunk"));
    let (mut streaming, mut bus) = streaming(provider);
    let mut session = Session::new("/tmp");
    session.set_prompt("hi");

    let handle = streaming.start(&session);
    let g = handle.generation();
    let events = collect_until_terminal(&mut bus, g).await;
    assert_eq!(
        events,
        vec![
            Event::StreamChunk { generation: g, text: "partial".into() },
            Event::StreamError { generation: g, error: "bad chunk".into() },
        ]
    );
}

/// Chunks alone are not a complete reply
#[tokio::test]
async fn test_stream_closed_without_end_is_an_error() {
    let (mut streaming, mut bus) = streaming(MockProvider::new(["to", "ken"]).without_end());
    let mut session = Session::new("/tmp");
    session.set_prompt("hi");

    let handle = streaming.start(&session);
    let g = handle.generation();
    let events = collect_until_terminal(&mut bus, g).await;
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events.last(),
        Some(Event::StreamError { generation, error })
            if *generation == g && error.contains("ended before the reply was complete")
    ));
}

#[tokio::test]
async fn test_drop_cancels_live_stream() {
    let provider = MockProvider::new(["slow"]).with_delay(Duration::from_millis(50));
    let (mut streaming, mut bus) = streaming(provider);
    let mut session = Session::new("/tmp");
    session.set_prompt("hi");

    let handle = streaming.start(&session);
    drop(streaming);

    assert!(handle.is_cancelled());
    assert_eq!(
        next_event(&mut bus).await,
        Event::Cancelled { generation: handle.generation() }
    );
}
