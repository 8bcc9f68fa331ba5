use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

use super::protocol::{encode, Request};

/// Directory name under `.local/share` that holds the socket
pub const APP_DIR: &str = "mark";

/// Socket path of the instance running in `working_dir`. Pure; touches no files.
pub fn resolve_socket_path(working_dir: impl AsRef<Path>) -> PathBuf {
    working_dir
        .as_ref()
        .join(".local")
        .join("share")
        .join(APP_DIR)
        .join("socket")
}

#[derive(Debug)]
pub enum ClientError {
    /// No socket file: nothing is running in that directory
    NotRunning { socket_path: PathBuf },
    Io(io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunning { socket_path } => write!(
                f,
                "couldn't find socket path: {} (is mark running in this directory?)",
                socket_path.display()
            ),
            Self::Io(e) => write!(f, "socket error: {e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotRunning { .. } => None,
            Self::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Short-lived client that pushes requests to a running instance.
/// The protocol is one-way: nothing is read back.
#[derive(Debug)]
pub struct RemoteClient {
    stream: UnixStream,
    socket_path: PathBuf,
}

impl RemoteClient {
    /// Connect to the socket at `socket_path`.
    /// Fails with `NotRunning` before dialing when the socket file is absent.
    pub async fn connect(socket_path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let socket_path = socket_path.as_ref().to_path_buf();

        if !socket_path.exists() {
            return Err(ClientError::NotRunning { socket_path });
        }

        let stream = UnixStream::connect(&socket_path).await?;
        Ok(Self {
            stream,
            socket_path,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Write one frame. Does not wait for any reply.
    pub async fn send(&mut self, request: &Request) -> Result<(), ClientError> {
        self.stream.write_all(&encode(request)).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Close the write side so the server sees EOF
    pub async fn finish(mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Resolve, connect, send one request and close
pub async fn send_request(working_dir: impl AsRef<Path>, request: &Request) -> Result<(), ClientError> {
    let mut client = RemoteClient::connect(resolve_socket_path(working_dir)).await?;
    client.send(request).await?;
    client.finish().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::protocol::decode;
    use tempfile::TempDir;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::UnixListener;

    #[test]
    fn resolve_is_deterministic() {
        let path = resolve_socket_path("/work/project");
        assert_eq!(path, PathBuf::from("/work/project/.local/share/mark/socket"));
        assert_eq!(path, resolve_socket_path("/work/project"));
    }

    #[test]
    fn resolve_does_not_create_anything() {
        let dir = TempDir::new().unwrap();
        let path = resolve_socket_path(dir.path());
        assert!(!path.exists());
        assert!(!dir.path().join(".local").exists());
    }

    #[tokio::test]
    async fn missing_socket_is_not_running_and_names_the_path() {
        let dir = TempDir::new().unwrap();
        let expected = resolve_socket_path(dir.path());

        let err = RemoteClient::connect(&expected).await.unwrap_err();
        match &err {
            ClientError::NotRunning { socket_path } => assert_eq!(socket_path, &expected),
            other => panic!("expected NotRunning, got {other:?}"),
        }
        assert!(err.to_string().contains(&expected.display().to_string()));
    }

    #[tokio::test]
    async fn existing_file_without_listener_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("socket");
        std::fs::write(&path, "").unwrap();

        let err = RemoteClient::connect(&path).await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[tokio::test]
    async fn send_writes_one_frame() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("socket");
        let listener = UnixListener::bind(&path).unwrap();

        let mut client = RemoteClient::connect(&path).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        let request = Request::with_args("add-context-item-file", vec!["src/main.rs".into()]);
        client.send(&request).await.unwrap();
        client.finish().await.unwrap();

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(decode(line.as_bytes()).unwrap(), request);

        // Nothing after the frame
        line.clear();
        assert_eq!(reader.read_line(&mut line).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn send_request_uses_working_dir_socket() {
        let dir = TempDir::new().unwrap();
        let path = resolve_socket_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let listener = UnixListener::bind(&path).unwrap();

        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            line
        });

        send_request(dir.path(), &Request::new("run")).await.unwrap();
        let line = accept.await.unwrap();
        assert_eq!(decode(line.as_bytes()).unwrap(), Request::new("run"));
    }
}
