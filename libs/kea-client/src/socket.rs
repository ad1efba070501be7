//! kea daemon unix control socket
use std::{
    os::unix::fs::FileTypeExt,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
};
use tracing::trace;

use crate::{
    command::{Command, Reply, Response},
    error::{ClientError, ClientResult},
    transport::Transport,
};

/// One connection per command: write the request, read until the daemon
/// closes the stream.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    path: PathBuf,
    timeout: Duration,
}

impl SocketTransport {
    /// Fails if `path` does not exist or is not a socket.
    pub fn new<P: Into<PathBuf>>(path: P, timeout: Duration) -> ClientResult<Self> {
        let path = path.into();
        let invalid = |reason: String| ClientError::InvalidTarget {
            target: path.display().to_string(),
            reason,
        };
        let meta = std::fs::metadata(&path).map_err(|err| invalid(err.to_string()))?;
        if !meta.file_type().is_socket() {
            return Err(invalid("not a unix socket".to_owned()));
        }
        Ok(Self { path, timeout })
    }

    /// socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn exchange(&self, request: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut stream = UnixStream::connect(&self.path).await?;
        stream.write_all(request).await?;
        let mut buf = Vec::with_capacity(4096);
        stream.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn send(&self, command: &Command) -> ClientResult<Vec<Response>> {
        let request = serde_json::to_vec(command)?;
        let buf = tokio::time::timeout(self.timeout, self.exchange(&request))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
            .map_err(|source| ClientError::Socket {
                path: self.path.clone(),
                source,
            })?;
        trace!(path = %self.path.display(), len = buf.len(), "read reply");
        Reply::parse(&buf)
    }

    fn is_agent(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};
    use tokio::net::UnixListener;

    use super::*;

    fn socket_path() -> PathBuf {
        static COUNT: AtomicUsize = AtomicUsize::new(0);
        std::env::temp_dir().join(format!(
            "kea-client-{}-{}.sock",
            std::process::id(),
            COUNT.fetch_add(1, Ordering::Relaxed)
        ))
    }

    /// reads one request and answers with `reply` (or hangs if None)
    fn serve(path: &Path, reply: Option<Value>) -> tokio::task::JoinHandle<Value> {
        let listener = UnixListener::bind(path).unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let request: Value = serde_json::from_slice(&buf[..n]).unwrap();
            match reply {
                Some(reply) => {
                    stream
                        .write_all(&serde_json::to_vec(&reply).unwrap())
                        .await
                        .unwrap();
                    stream.shutdown().await.unwrap();
                }
                None => tokio::time::sleep(Duration::from_secs(60)).await,
            }
            request
        })
    }

    #[tokio::test]
    async fn test_socket_roundtrip() {
        let path = socket_path();
        let server = serve(
            &path,
            Some(json!({"result": 0, "arguments": {"pkt4-received": [[3, "2024-01-01 00:00:00.0"]]}})),
        );
        let transport = SocketTransport::new(&path, Duration::from_secs(2)).unwrap();

        let responses = transport
            .send(&Command::new("statistic-get-all").arguments(json!({})))
            .await
            .unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].result, 0);
        assert_eq!(
            server.await.unwrap(),
            json!({"command": "statistic-get-all", "arguments": {}})
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_socket_timeout() {
        let path = socket_path();
        let _server = serve(&path, None);
        let transport = SocketTransport::new(&path, Duration::from_millis(100)).unwrap();

        let err = transport.send(&Command::new("config-get")).await.unwrap_err();
        assert!(err.is_timeout(), "{err}");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_socket_rejected() {
        let err = SocketTransport::new("/nonexistent/kea4-ctrl-socket", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidTarget { .. }));
        // regular files are not sockets
        let err = SocketTransport::new(
            env!("CARGO_MANIFEST_DIR").to_owned() + "/Cargo.toml",
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a unix socket"));
    }
}
