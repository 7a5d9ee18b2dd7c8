use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::FtpError;

/// Splits one connection into its two framed halves.
///
/// The halves perform no locking of their own: a session serializes its
/// writers externally so command lines and payload chunks never interleave
/// mid-write, and the protocol guarantees a single reader per outstanding
/// command.
pub fn split(stream: TcpStream) -> (ChannelReader, ChannelWriter) {
    let (read_half, write_half) = stream.into_split();
    (
        ChannelReader {
            inner: BufReader::new(read_half),
        },
        ChannelWriter { inner: write_half },
    )
}

pub struct ChannelReader {
    inner: BufReader<OwnedReadHalf>,
}

impl ChannelReader {
    /// Reads one newline-terminated UTF-8 line, without the terminator.
    ///
    /// A zero-byte read, or data ending before the newline, is a severed
    /// connection; no data inside the given duration is a timeout.
    pub async fn read_line(&mut self, limit: Duration) -> Result<String, FtpError> {
        let mut line = String::new();
        let n = match timeout(limit, self.inner.read_line(&mut line)).await {
            Err(_) => return Err(FtpError::Timeout(limit)),
            Ok(Err(e)) => return Err(FtpError::from_socket(e)),
            Ok(Ok(n)) => n,
        };
        if n == 0 || !line.ends_with('\n') {
            return Err(FtpError::ConnectionClosed);
        }
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    /// Fills `buf` with raw payload bytes. The caller sizes `buf` to one
    /// bounded chunk of the declared length, never more.
    pub async fn read_bytes(&mut self, buf: &mut [u8], limit: Duration) -> Result<(), FtpError> {
        match timeout(limit, self.inner.read_exact(buf)).await {
            Err(_) => Err(FtpError::Timeout(limit)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(FtpError::ConnectionClosed)
            }
            Ok(Err(e)) => Err(FtpError::from_socket(e)),
            Ok(Ok(_)) => Ok(()),
        }
    }
}

pub struct ChannelWriter {
    inner: OwnedWriteHalf,
}

impl ChannelWriter {
    /// Sends one line. The terminator is appended here; an embedded newline
    /// would smuggle a second command onto the wire and is refused.
    pub async fn send_line(&mut self, line: &str) -> Result<(), FtpError> {
        if line.contains('\n') {
            return Err(FtpError::ProtocolViolation(format!(
                "line contains embedded newline: {:?}",
                line
            )));
        }
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        self.inner
            .write_all(framed.as_bytes())
            .await
            .map_err(FtpError::from_socket)?;
        self.inner.flush().await.map_err(FtpError::from_socket)?;
        Ok(())
    }

    /// Sends one raw payload chunk.
    pub async fn write_bytes(&mut self, buf: &[u8]) -> Result<(), FtpError> {
        self.inner
            .write_all(buf)
            .await
            .map_err(FtpError::from_socket)?;
        self.inner.flush().await.map_err(FtpError::from_socket)?;
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        let _ = self.inner.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn line_roundtrip_strips_terminators() {
        let (a, b) = pair().await;
        let (_, mut writer) = split(a);
        let (mut reader, _) = split(b);

        writer.send_line("CD docs and more").await.unwrap();
        let line = reader.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(line, "CD docs and more");
    }

    #[tokio::test]
    async fn crlf_is_tolerated() {
        let (mut a, b) = pair().await;
        let (mut reader, _) = split(b);
        a.write_all(b"NOOP\r\n").await.unwrap();
        let line = reader.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(line, "NOOP");
    }

    #[tokio::test]
    async fn embedded_newline_is_refused() {
        let (a, _b) = pair().await;
        let (_, mut writer) = split(a);
        let err = writer.send_line("LIST\nQUIT").await.unwrap_err();
        assert!(matches!(err, FtpError::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn peer_close_is_connection_closed() {
        let (a, b) = pair().await;
        let (mut reader, _) = split(a);
        drop(b);
        let err = reader.read_line(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, FtpError::ConnectionClosed));
    }

    #[tokio::test]
    async fn partial_line_before_close_is_connection_closed() {
        let (a, mut b) = pair().await;
        let (mut reader, _) = split(a);
        b.write_all(b"SENDING_FI").await.unwrap();
        drop(b);
        let err = reader.read_line(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, FtpError::ConnectionClosed));
    }

    #[tokio::test]
    async fn silent_peer_is_timeout() {
        let (a, _b) = pair().await;
        let (mut reader, _) = split(a);
        let err = reader
            .read_line(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, FtpError::Timeout(_)));
    }

    #[tokio::test]
    async fn short_payload_read_is_connection_closed() {
        let (a, mut b) = pair().await;
        let (mut reader, _) = split(a);
        b.write_all(&[0u8; 100]).await.unwrap();
        drop(b);
        let mut buf = [0u8; 256];
        let err = reader
            .read_bytes(&mut buf, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FtpError::ConnectionClosed));
    }
}
