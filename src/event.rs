//! Events flowing into the application loop and the bus that carries them.
//!
//! Producers (the remote server's connection tasks and the streaming relay)
//! push onto a single bounded [`EventSender`]. Exactly one [`BusListener`]
//! task drains the bus, wrapping each event in [`Event::Envelope`] and handing
//! it to the application inbox before waiting for the next one.

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default number of events the bus buffers before producers wait
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Identity of one streaming completion; higher is newer
pub type Generation = u64;

/// Whether an error ends the application loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote-control transport is gone (e.g., accept failed). Fatal.
    Transport,
    /// A malformed frame or unknown command. Reported and absorbed.
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EventError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Protocol,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Transport
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EventError {}

/// Everything the application loop reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    WindowResize { width: u16, height: u16 },
    AddContextText { text: String },
    AddContextFile { path: String },
    RunRequested,
    NewSessionRequested,
    StreamChunk { generation: Generation, text: String },
    StreamEnd { generation: Generation, final_text: String },
    StreamError { generation: Generation, error: String },
    Cancelled { generation: Generation },
    Error(EventError),
    /// An event that arrived through the bus rather than from local input
    Envelope(Box<Event>),
}

impl Event {
    pub fn envelope(event: Event) -> Self {
        Self::Envelope(Box::new(event))
    }

    /// Generation of a streaming event
    pub fn generation(&self) -> Option<Generation> {
        match self {
            Self::StreamChunk { generation, .. }
            | Self::StreamEnd { generation, .. }
            | Self::StreamError { generation, .. }
            | Self::Cancelled { generation } => Some(*generation),
            Self::Envelope(inner) => inner.generation(),
            _ => None,
        }
    }

    /// True for the events that end a stream
    pub fn is_stream_terminal(&self) -> bool {
        match self {
            Self::StreamEnd { .. } | Self::StreamError { .. } | Self::Cancelled { .. } => true,
            Self::Envelope(inner) => inner.is_stream_terminal(),
            _ => false,
        }
    }

    /// Short name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::WindowResize { .. } => "window_resize",
            Self::AddContextText { .. } => "add_context_text",
            Self::AddContextFile { .. } => "add_context_file",
            Self::RunRequested => "run_requested",
            Self::NewSessionRequested => "new_session_requested",
            Self::StreamChunk { .. } => "stream_chunk",
            Self::StreamEnd { .. } => "stream_end",
            Self::StreamError { .. } => "stream_error",
            Self::Cancelled { .. } => "cancelled",
            Self::Error(_) => "error",
            Self::Envelope(_) => "envelope",
        }
    }
}

/// Producer side of the bus. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    /// Push an event, waiting while the bus is full.
    /// Returns false once the consumer is gone.
    pub async fn send(&self, event: Event) -> bool {
        self.tx.send(event).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the bus. Owned by exactly one [`BusListener`].
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Create the bus
pub fn bus(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx }, EventReceiver { rx })
}

/// Create the application inbox. Capacity 1: the listener holds at most one
/// bus event that the loop has not taken yet.
pub fn inbox() -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
    mpsc::channel(1)
}

/// Dedicated task that keeps exactly one receive outstanding on the bus
pub struct BusListener {
    handle: JoinHandle<()>,
}

impl BusListener {
    pub fn spawn(mut bus: EventReceiver, inbox: mpsc::Sender<Event>) -> Self {
        let handle = tokio::spawn(async move {
            while let Some(event) = bus.recv().await {
                tracing::trace!(event = event.name(), "bus event received");
                if inbox.send(Event::envelope(event)).await.is_err() {
                    break;
                }
            }
            tracing::debug!("bus listener stopped");
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for BusListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
