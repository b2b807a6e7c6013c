//! Line transport over any async byte stream.
//!
//! Used directly for raw instrument sockets and as the link under a Prologix
//! GPIB-ETHERNET controller. Tests drive it over `tokio::io::duplex`.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{
    split, AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
    ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use super::Transport;
use crate::error::{AppResult, BenchError};

/// Line-oriented transport over any async byte stream.
pub struct StreamTransport<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    endpoint: String,
    timeout: Duration,
    write_terminator: String,
    read_delimiter: u8,
}

impl StreamTransport<TcpStream> {
    /// Connect to `host:port` within `io_timeout`.
    pub async fn connect_tcp(
        address: &str,
        io_timeout: Duration,
        write_terminator: &str,
        read_delimiter: u8,
    ) -> AppResult<Self> {
        let stream = timeout(io_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| BenchError::timeout(format!("connect to {}", address), io_timeout))?
            .map_err(|e| BenchError::Transport(format!("connect to {}: {}", address, e)))?;
        stream.set_nodelay(true)?;
        info!(address, "TCP link established");
        Ok(Self::new(
            stream,
            address,
            io_timeout,
            write_terminator,
            read_delimiter,
        ))
    }
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    /// Wrap `stream`; `timeout` bounds every operation.
    pub fn new(
        stream: S,
        endpoint: impl Into<String>,
        io_timeout: Duration,
        write_terminator: &str,
        read_delimiter: u8,
    ) -> Self {
        let (reader, writer) = split(stream);
        Self {
            reader: BufReader::new(reader),
            writer,
            endpoint: endpoint.into(),
            timeout: io_timeout,
            write_terminator: write_terminator.to_string(),
            read_delimiter,
        }
    }

    /// Bound applied to every operation.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn write(&mut self, command: &str) -> AppResult<()> {
        let mut frame = Vec::with_capacity(command.len() + self.write_terminator.len());
        frame.extend_from_slice(command.as_bytes());
        frame.extend_from_slice(self.write_terminator.as_bytes());

        let writer = &mut self.writer;
        timeout(self.timeout, async move {
            writer.write_all(&frame).await?;
            writer.flush().await
        })
        .await
        .map_err(|_| BenchError::timeout(format!("write to {}", self.endpoint), self.timeout))??;

        debug!(endpoint = %self.endpoint, command = %command.escape_debug(), "Sent");
        Ok(())
    }

    async fn read_response(&mut self) -> AppResult<String> {
        let mut buf = Vec::new();
        let read = timeout(
            self.timeout,
            self.reader.read_until(self.read_delimiter, &mut buf),
        )
        .await
        .map_err(|_| BenchError::timeout(format!("read from {}", self.endpoint), self.timeout))??;

        if read == 0 {
            return Err(BenchError::Transport(format!(
                "{} closed the connection",
                self.endpoint
            )));
        }

        let reply = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        debug!(endpoint = %self.endpoint, bytes = read, "Received");
        Ok(reply)
    }

    /// Raw sockets have no GPIB clear; stale buffered input is dropped instead.
    async fn clear(&mut self) -> AppResult<()> {
        let stale = self.reader.buffer().len();
        AsyncBufRead::consume(Pin::new(&mut self.reader), stale);
        if stale > 0 {
            debug!(endpoint = %self.endpoint, bytes = stale, "Discarded buffered input");
        }
        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        timeout(self.timeout, self.writer.shutdown())
            .await
            .map_err(|_| BenchError::timeout(format!("close {}", self.endpoint), self.timeout))??;
        info!(endpoint = %self.endpoint, "Link closed");
        Ok(())
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    fn pair(
        io_timeout: Duration,
    ) -> (StreamTransport<tokio::io::DuplexStream>, tokio::io::DuplexStream) {
        let (local, remote) = duplex(1024);
        (
            StreamTransport::new(local, "duplex", io_timeout, "\n", b'\n'),
            remote,
        )
    }

    #[tokio::test]
    async fn test_write_appends_terminator() {
        let (mut link, mut remote) = pair(Duration::from_secs(1));
        link.write("*IDN?").await.unwrap();

        let mut buf = [0u8; 6];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"*IDN?\n");
    }

    #[tokio::test]
    async fn test_read_strips_crlf() {
        let (mut link, mut remote) = pair(Duration::from_secs(1));
        remote.write_all(b"HEWLETT-PACKARD,4145B\r\nnext\n").await.unwrap();

        assert_eq!(link.read_response().await.unwrap(), "HEWLETT-PACKARD,4145B");
        assert_eq!(link.read_response().await.unwrap(), "next");
    }

    #[tokio::test]
    async fn test_read_times_out() {
        let (mut link, _remote) = pair(Duration::from_millis(50));
        let err = link.read_response().await.unwrap_err();
        assert!(matches!(err, BenchError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_peer_close_is_transport_error() {
        let (mut link, remote) = pair(Duration::from_secs(1));
        drop(remote);
        let err = link.read_response().await.unwrap_err();
        assert!(matches!(err, BenchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_serial_poll_unsupported() {
        let (mut link, _remote) = pair(Duration::from_secs(1));
        assert!(matches!(
            link.serial_poll().await,
            Err(BenchError::Unsupported(_))
        ));
    }
}
