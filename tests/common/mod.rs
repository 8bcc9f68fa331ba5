#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mark::app::App;
use mark::event::{self, Event, EventReceiver, EventSender};
use mark::llm::{MockProvider, StreamingSession};
use ratatui::{backend::TestBackend, Terminal};
use tempfile::TempDir;

/// How long a test waits for an event before giving up
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// App wired to a mock provider, with the bus receiver handed back to the test
pub struct TestApp {
    pub dir: TempDir,
    pub app: App,
    pub bus: EventReceiver,
    pub sink: EventSender,
}

impl TestApp {
    /// Next event the relay put on the bus
    pub async fn next_event(&mut self) -> Event {
        next_event(&mut self.bus).await
    }

    /// Feed bus events into the app until a terminal stream event was applied
    pub async fn drain_stream(&mut self) -> Vec<Event> {
        let mut seen = Vec::new();
        loop {
            let event = self.next_event().await;
            let terminal = event.is_stream_terminal();
            seen.push(event.clone());
            self.app.update(event).unwrap();
            if terminal {
                return seen;
            }
        }
    }
}

/// Helper to create an App backed by `provider` in a fresh temp directory
pub fn create_test_app(provider: MockProvider) -> TestApp {
    let dir = TempDir::new().unwrap();
    let (sink, bus) = event::bus(event::DEFAULT_BUS_CAPACITY);
    let streaming = StreamingSession::new(Arc::new(provider), sink.clone());
    let app = App::new(dir.path(), streaming);
    TestApp { dir, app, bus, sink }
}

pub async fn next_event(bus: &mut EventReceiver) -> Event {
    tokio::time::timeout(EVENT_TIMEOUT, bus.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event bus closed")
}

/// Helper to render the app to a test terminal and return the buffer as a string
pub fn render_app_to_string(app: &App, width: u16, height: u16) -> String {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();

    terminal
        .draw(|f| {
            mark::ui::draw(f, app);
        })
        .unwrap();

    let buffer = terminal.backend().buffer();
    let mut result = String::new();
    for y in 0..height {
        for x in 0..width {
            let cell = buffer.cell((x, y)).unwrap();
            result.push_str(cell.symbol());
        }
        result.push('\n');
    }
    result
}
