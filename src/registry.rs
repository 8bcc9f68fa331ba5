use std::fmt;

use crate::event::{Event, EventError};
use crate::ipc::protocol::Request;

/// Builds the event for a command. Receives the raw request and performs no
/// validation; file paths are only checked when the context item is read.
pub type EventConstructor = fn(&Request) -> Event;

/// One remotely invocable command
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    pub name: &'static str,
    /// One-line description shown in `mark --help`
    pub about: &'static str,
    /// Names of the positional arguments; their count is the arity
    pub arg_names: &'static [&'static str],
    /// Whether the CLI offers `--stdin` for this command
    pub accepts_stdin: bool,
    constructor: EventConstructor,
}

impl CommandDescriptor {
    pub fn arity(&self) -> usize {
        self.arg_names.len()
    }

    pub fn to_event(&self, request: &Request) -> Event {
        (self.constructor)(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    UnknownCommand(String),
    Arity {
        command: String,
        expected: usize,
        got: usize,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(name) => write!(f, "unknown command: {name}"),
            Self::Arity {
                command,
                expected,
                got,
            } => write!(
                f,
                "{command} takes exactly {expected} argument(s), got {got}"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Immutable table of commands, built once at startup
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new(commands: Vec<CommandDescriptor>) -> Self {
        Self { commands }
    }

    /// The commands a running instance understands
    pub fn builtin() -> Self {
        Self::new(vec![
            CommandDescriptor {
                name: "new-session",
                about: "Start a new session",
                arg_names: &[],
                accepts_stdin: false,
                constructor: |_| Event::NewSessionRequested,
            },
            CommandDescriptor {
                name: "add-context-item-text",
                about: "Add a text item to the context",
                arg_names: &["message"],
                accepts_stdin: true,
                constructor: |req| Event::AddContextText {
                    text: req.text_payload(),
                },
            },
            CommandDescriptor {
                name: "add-context-item-file",
                about: "Add a file item to the context",
                arg_names: &["path"],
                accepts_stdin: false,
                constructor: |req| Event::AddContextFile {
                    path: req.arg(0).to_string(),
                },
            },
            CommandDescriptor {
                name: "run",
                about: "Run the agent on the current prompt",
                arg_names: &[],
                accepts_stdin: false,
                constructor: |_| Event::RunRequested,
            },
        ])
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Exact-arity check done by the CLI before sending
    pub fn check_arity(&self, name: &str, got: usize) -> Result<(), RegistryError> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownCommand(name.to_string()))?;

        if descriptor.arity() != got {
            return Err(RegistryError::Arity {
                command: name.to_string(),
                expected: descriptor.arity(),
                got,
            });
        }
        Ok(())
    }

    /// Translate a decoded request into the event the application handles.
    /// Unknown commands become a protocol error event naming the command.
    pub fn to_event(&self, request: &Request) -> Event {
        match self.get(&request.command) {
            Some(descriptor) => descriptor.to_event(request),
            None => Event::Error(EventError::protocol(
                RegistryError::UnknownCommand(request.command.clone()).to_string(),
            )),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
