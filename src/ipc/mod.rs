// Remote control over a per-directory Unix socket.
// CLI clients push one-way commands into the running TUI.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{resolve_socket_path, send_request, ClientError, RemoteClient};
pub use protocol::{decode, encode, DecodeError, Request};
pub use server::{RemoteServer, ServerHandle};
