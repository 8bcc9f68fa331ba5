use std::fs;
use std::future::Future;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::resolve_socket_path;
use super::protocol::{decode, MAX_FRAME_BYTES};
use crate::event::{Event, EventError, EventSender};
use crate::registry::CommandRegistry;

/// Accepts remote clients on the per-directory socket and turns their
/// frames into events on the bus.
pub struct RemoteServer {
    listener: UnixListener,
    socket_path: PathBuf,
    sink: EventSender,
    registry: Arc<CommandRegistry>,
    shutdown: CancellationToken,
}

/// Closes a running server from outside the accept loop
#[derive(Debug, Clone)]
pub struct ServerHandle {
    socket_path: PathBuf,
    shutdown: CancellationToken,
}

impl ServerHandle {
    /// Stop accepting and remove the socket file. Safe to call repeatedly.
    pub fn close(&self) {
        self.shutdown.cancel();
        remove_socket(&self.socket_path);
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl RemoteServer {
    /// Bind the socket for `working_dir`.
    ///
    /// A leftover socket file with nobody listening is replaced. If another
    /// instance still answers on it, binding fails with `AddrInUse`.
    pub fn start(
        working_dir: impl AsRef<Path>,
        sink: EventSender,
        registry: CommandRegistry,
    ) -> io::Result<Self> {
        let socket_path = resolve_socket_path(working_dir);

        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)?;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
        }

        if socket_path.exists() {
            if std::os::unix::net::UnixStream::connect(&socket_path).is_ok() {
                return Err(io::Error::new(
                    io::ErrorKind::AddrInUse,
                    format!(
                        "another instance is already listening on {}",
                        socket_path.display()
                    ),
                ));
            }
            debug!(socket = %socket_path.display(), "removing stale socket");
            fs::remove_file(&socket_path)?;
        }

        let listener = UnixListener::bind(&socket_path)?;
        info!(socket = %socket_path.display(), "remote server listening");

        Ok(Self {
            listener,
            socket_path,
            sink,
            registry: Arc::new(registry),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            socket_path: self.socket_path.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn close(&self) {
        self.handle().close();
    }

    /// Accept loop. Runs until closed or until accepting fails, which is
    /// reported as a transport error on the bus.
    pub async fn serve(self) {
        let listener = &self.listener;
        accept_loop(
            move || async move { listener.accept().await.map(|(stream, _addr)| stream) },
            &self.sink,
            &self.registry,
            &self.shutdown,
        )
        .await;

        info!(socket = %self.socket_path.display(), "remote server stopped");
    }
}

/// Hand each accepted connection to its own task. The first accept error is
/// pushed as a transport error and ends the loop.
async fn accept_loop<A, F>(
    mut accept: A,
    sink: &EventSender,
    registry: &Arc<CommandRegistry>,
    shutdown: &CancellationToken,
) where
    A: FnMut() -> F,
    F: Future<Output = io::Result<UnixStream>>,
{
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = accept() => match accepted {
                Ok(stream) => {
                    debug!("remote client connected");
                    tokio::spawn(handle_connection(
                        stream,
                        sink.clone(),
                        Arc::clone(registry),
                        shutdown.clone(),
                    ));
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                    sink.send(Event::Error(EventError::transport(format!(
                        "failed to accept socket connection: {e}"
                    ))))
                    .await;
                    break;
                }
            }
        }
    }
}

impl Drop for RemoteServer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read frames from one client until EOF. Bad frames are reported and skipped.
async fn handle_connection(
    stream: UnixStream,
    sink: EventSender,
    registry: Arc<CommandRegistry>,
    shutdown: CancellationToken,
) {
    let mut reader = BufReader::new(stream);
    let mut frame = Vec::new();

    loop {
        frame.clear();
        let read = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            read = read_frame(&mut reader, &mut frame) => read,
        };

        match read {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "remote client read failed");
                break;
            }
        }

        if frame.len() > MAX_FRAME_BYTES && frame.last() != Some(&b'\n') {
            warn!(limit = MAX_FRAME_BYTES, "oversized frame from remote client");
            sink.send(Event::Error(EventError::protocol(format!(
                "client request exceeds {MAX_FRAME_BYTES} bytes"
            ))))
            .await;
            break;
        }

        if frame.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let event = match decode(&frame) {
            Ok(request) => {
                debug!(command = %request.command, args = request.args.len(), "remote command");
                registry.to_event(&request)
            }
            Err(e) => {
                warn!(error = %e, "bad frame from remote client");
                Event::Error(EventError::protocol(format!(
                    "failed to parse client request: {e}"
                )))
            }
        };

        if !sink.send(event).await {
            break;
        }
    }

    debug!("remote client disconnected");
}

/// Read up to one newline, or one byte past the frame limit
async fn read_frame<R>(reader: &mut R, frame: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(MAX_FRAME_BYTES as u64 + 1);
    limited.read_until(b'\n', frame).await
}

fn remove_socket(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(socket = %path.display(), "socket removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(socket = %path.display(), error = %e, "could not remove socket"),
    }
}
