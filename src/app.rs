//! Application state and the reducer that applies events to it.
//!
//! `App::update` is the only place session state changes. Remote commands,
//! stream output and local key actions all end up here, one at a time.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::event::{Event, Generation};
use crate::llm::StreamingSession;
use crate::session::Session;
use crate::ui::input_state::InputState;
use crate::ui::types::{Dialog, DialogKind, Focus, StatusType};

/// Whether a completion is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingReply { generation: Generation },
    /// Cancel requested; waiting for the relay to confirm
    Cancelling { generation: Generation },
}

impl Phase {
    pub fn generation(&self) -> Option<Generation> {
        match self {
            Self::Idle => None,
            Self::AwaitingReply { generation } | Self::Cancelling { generation } => {
                Some(*generation)
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub session: Session,
    streaming: StreamingSession,
    pub phase: Phase,
    /// Prompt editor
    pub input: InputState,
    pub focus: Focus,
    pub dialog: Option<Dialog>,
    pub show_help: bool,
    /// Highlighted row of the context list
    pub selected_context: usize,
    /// Lines scrolled in the reply view
    pub reply_scroll: u16,
    /// Status message to show to the user (message, type)
    pub status_message: Option<(String, StatusType)>,
    /// Last known terminal size (width, height)
    pub size: (u16, u16),
    /// Width of the context list as a percentage of the terminal
    pub sidebar_percent: u16,
    /// Events received through the bus listener
    pub bus_deliveries: u64,
    pub should_quit: bool,
}

impl App {
    pub fn new(working_dir: impl Into<PathBuf>, streaming: StreamingSession) -> Self {
        Self {
            session: Session::new(working_dir),
            streaming,
            phase: Phase::Idle,
            input: InputState::new(),
            focus: Focus::Input,
            dialog: None,
            show_help: false,
            selected_context: 0,
            reply_scroll: 0,
            status_message: None,
            size: (0, 0),
            sidebar_percent: 30,
            bus_deliveries: 0,
            should_quit: false,
        }
    }

    pub fn with_sidebar_percent(mut self, percent: u16) -> Self {
        self.sidebar_percent = percent;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.streaming.provider_name()
    }

    /// Apply one event. A transport error ends the loop and is returned.
    pub fn update(&mut self, event: Event) -> anyhow::Result<Flow> {
        match event {
            Event::Envelope(inner) => {
                self.bus_deliveries += 1;
                return self.update(*inner);
            }
            Event::WindowResize { width, height } => {
                self.size = (width, height);
            }
            Event::AddContextText { text } => self.add_context_text(text),
            Event::AddContextFile { path } => self.add_context_file(&path),
            Event::RunRequested => self.run(),
            Event::NewSessionRequested => self.new_session(),
            Event::StreamChunk { generation, text } => {
                if self.phase == (Phase::AwaitingReply { generation }) {
                    self.session.append_chunk(&text);
                } else {
                    debug!(generation, "dropping chunk from inactive stream");
                }
            }
            Event::StreamEnd {
                generation,
                final_text,
            } => {
                if self.finish_stream(generation) {
                    self.session.finish_streaming(final_text);
                    self.set_status_success("Reply complete".to_string());
                }
            }
            Event::Cancelled { generation } => {
                if self.finish_stream(generation) {
                    self.set_status_info("Reply cancelled".to_string());
                }
            }
            Event::StreamError { generation, error } => {
                if self.finish_stream(generation) {
                    self.set_status_error(format!("Reply failed: {error}"));
                    self.dialog = Some(Dialog::new(DialogKind::Error(error)));
                }
            }
            Event::Error(err) if err.is_fatal() => {
                self.streaming.cancel();
                self.phase = Phase::Idle;
                return Err(anyhow::Error::new(err));
            }
            Event::Error(err) => {
                warn!(error = %err, "remote command rejected");
                self.set_status_error(err.message);
            }
        }

        Ok(self.flow())
    }

    fn flow(&self) -> Flow {
        if self.should_quit {
            Flow::Quit
        } else {
            Flow::Continue
        }
    }

    /// Commit typed input as the prompt and start a completion
    fn run(&mut self) {
        if !self.phase.is_idle() {
            self.set_status_info("A reply is already streaming".to_string());
            return;
        }

        if !self.input.is_blank() {
            let prompt = self.input.take();
            self.session.set_prompt(prompt);
        }

        if self.session.prompt().trim().is_empty() {
            self.set_status_info("Nothing to run: the prompt is empty".to_string());
            return;
        }

        self.session.clear_reply();
        self.reply_scroll = 0;
        let handle = self.streaming.start(&self.session);
        self.phase = Phase::AwaitingReply {
            generation: handle.generation(),
        };
        self.set_status_info("Waiting for reply...".to_string());
    }

    /// Leave the streaming phase if `generation` is the one in flight
    fn finish_stream(&mut self, generation: Generation) -> bool {
        if self.phase.generation() != Some(generation) {
            debug!(generation, "dropping terminal event from inactive stream");
            return false;
        }
        self.streaming.finish(generation);
        self.phase = Phase::Idle;
        true
    }

    /// Ctrl+C: stop the live completion. Its partial reply stays.
    pub fn cancel_stream(&mut self) {
        if let Phase::AwaitingReply { generation } = self.phase {
            self.streaming.cancel();
            self.phase = Phase::Cancelling { generation };
            self.set_status_info("Cancelling...".to_string());
        }
    }

    pub fn new_session(&mut self) {
        self.streaming.cancel();
        let working_dir = self.session.working_dir().to_path_buf();
        self.session = Session::new(working_dir);
        self.phase = Phase::Idle;
        self.input.clear();
        self.focus = Focus::Input;
        self.selected_context = 0;
        self.reply_scroll = 0;
        info!("new session");
        self.set_status_info("New session".to_string());
    }

    pub fn delete_context_item(&mut self, index: usize) {
        if self.session.delete_context_item(index).is_some() {
            let len = self.session.context().len();
            if self.selected_context >= len {
                self.selected_context = len.saturating_sub(1);
            }
        }
    }

    pub fn select_next_context(&mut self) {
        let len = self.session.context().len();
        if len > 0 && self.selected_context + 1 < len {
            self.selected_context += 1;
        }
    }

    pub fn select_prev_context(&mut self) {
        self.selected_context = self.selected_context.saturating_sub(1);
    }

    pub fn open_dialog(&mut self, kind: DialogKind) {
        self.dialog = Some(Dialog::new(kind));
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
    }

    /// Enter in a dialog: add its input as a context item
    pub fn submit_dialog(&mut self) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };

        let value = dialog.input.trim().to_string();
        if value.is_empty() {
            return;
        }
        match dialog.kind {
            DialogKind::AddText => self.add_context_text(value),
            DialogKind::AddFile => self.add_context_file(&value),
            DialogKind::Error(_) => {}
        }
    }

    fn add_context_text(&mut self, text: String) {
        self.session.add_context_text(text);
        self.set_status_info("Added text to context".to_string());
    }

    fn add_context_file(&mut self, path: &str) {
        self.session.add_context_file(path);
        self.set_status_info(format!("Added file {path} to context"));
    }

    pub fn cycle_focus(&mut self, forward: bool) {
        self.focus = if forward {
            self.focus.next()
        } else {
            self.focus.prev()
        };
    }

    pub fn scroll_reply_down(&mut self) {
        self.reply_scroll = self.reply_scroll.saturating_add(1);
    }

    pub fn scroll_reply_up(&mut self) {
        self.reply_scroll = self.reply_scroll.saturating_sub(1);
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn quit(&mut self) {
        self.streaming.cancel();
        self.should_quit = true;
    }

    pub fn set_status_success(&mut self, message: String) {
        self.status_message = Some((message, StatusType::Success));
    }

    pub fn set_status_error(&mut self, message: String) {
        self.status_message = Some((message, StatusType::Error));
    }

    pub fn set_status_info(&mut self, message: String) {
        self.status_message = Some((message, StatusType::Info));
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }
}
