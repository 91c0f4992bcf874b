//! One MPD socket plus its buffered line reader.
//!
//! A `Connection` only exists after the server greeting has been validated.
//! `execute` performs exactly one request/reply round trip and leaves the
//! stream at the start of the next reply.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use super::error::{CommandError, ConnectError};
use super::protocol::{parse_greeting, Command, ReplyLine};

/// Longest reply line accepted, excluding the newline.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Read one `\n`-terminated line. Invalid UTF-8 is replaced, not rejected.
///
/// `Ok(None)` means the peer closed the stream. A line longer than
/// [`MAX_LINE_LEN`] fails with `InvalidData`.
async fn read_line_lossy<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut bytes = Vec::new();
    let n = (&mut *reader)
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', &mut bytes)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if bytes.len() > MAX_LINE_LEN && !bytes.ends_with(b"\n") {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("reply line exceeds {} bytes", MAX_LINE_LEN),
        ));
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Per-connection I/O options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Upper bound for connect, each write and each line read.
    /// `None` keeps the protocol's native behaviour of waiting indefinitely.
    pub io_timeout: Option<Duration>,
}

impl ConnectOptions {
    pub fn with_io_timeout(io_timeout: Duration) -> Self {
        Self {
            io_timeout: Some(io_timeout),
        }
    }
}

/// Await `fut`, giving up after `limit` if one is set.
async fn bounded<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Validated MPD connection.
pub struct Connection<S = TcpStream> {
    stream: Option<BufReader<S>>,
    addr: String,
    server_version: String,
    io_timeout: Option<Duration>,
}

impl Connection<TcpStream> {
    /// Open a TCP connection and validate the greeting.
    pub async fn connect(addr: &str) -> Result<Self, ConnectError> {
        Self::connect_with(addr, ConnectOptions::default()).await
    }

    pub async fn connect_with(addr: &str, options: ConnectOptions) -> Result<Self, ConnectError> {
        let stream = match bounded(options.io_timeout, TcpStream::connect(addr)).await {
            None => {
                return Err(ConnectError::Timeout {
                    addr: addr.to_string(),
                })
            }
            Some(Err(source)) => {
                return Err(ConnectError::Io {
                    addr: addr.to_string(),
                    source,
                })
            }
            Some(Ok(stream)) => stream,
        };

        Self::handshake_with(stream, addr, options).await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Validate the greeting on an already-open stream.
    pub async fn handshake(stream: S, addr: &str) -> Result<Self, ConnectError> {
        Self::handshake_with(stream, addr, ConnectOptions::default()).await
    }

    pub async fn handshake_with(
        stream: S,
        addr: &str,
        options: ConnectOptions,
    ) -> Result<Self, ConnectError> {
        let mut reader = BufReader::new(stream);

        let read = bounded(options.io_timeout, read_line_lossy(&mut reader)).await;
        let server_version = match read {
            None => Err(ConnectError::Timeout {
                addr: addr.to_string(),
            }),
            Some(Err(source)) => Err(ConnectError::Io {
                addr: addr.to_string(),
                source,
            }),
            Some(Ok(None)) => Err(ConnectError::Closed {
                addr: addr.to_string(),
            }),
            Some(Ok(Some(line))) => parse_greeting(line.trim())
                .map(str::to_string)
                .ok_or_else(|| ConnectError::Greeting {
                    addr: addr.to_string(),
                    line: line.trim().to_string(),
                }),
        };

        match server_version {
            Ok(server_version) => {
                info!("MPD connected: {} (protocol {})", addr, server_version);
                Ok(Self {
                    stream: Some(reader),
                    addr: addr.to_string(),
                    server_version,
                    io_timeout: options.io_timeout,
                })
            }
            Err(err) => {
                // Release the half-open stream before reporting
                let _ = reader.shutdown().await;
                Err(err)
            }
        }
    }

    /// Address this connection was opened against.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Protocol version announced in the greeting.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// False after `close` or after a transport failure.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Send one command and collect its reply.
    pub async fn execute(&mut self, command: &Command) -> Result<Vec<String>, CommandError> {
        self.execute_line(&command.to_string()).await
    }

    /// Send one raw command line and collect its reply.
    ///
    /// Returns the payload lines preceding `OK`. An `ACK` reply fails with the
    /// server's text; the stream stays usable. Any transport failure discards
    /// the stream, so later calls fail with `CommandError::Closed`.
    pub async fn execute_line(&mut self, line: &str) -> Result<Vec<String>, CommandError> {
        let io_timeout = self.io_timeout;
        let stream = self.stream.as_mut().ok_or(CommandError::Closed)?;

        debug!("MPD -> {}", line);
        let result = Self::round_trip(stream, io_timeout, line).await;

        if let Err(e) = &result {
            if e.is_connection_lost() {
                debug!("MPD connection to {} unusable after: {}", self.addr, e);
                self.stream = None;
            }
        }
        result
    }

    async fn round_trip(
        stream: &mut BufReader<S>,
        io_timeout: Option<Duration>,
        line: &str,
    ) -> Result<Vec<String>, CommandError> {
        let request = format!("{}\n", line);
        let write = async {
            stream.write_all(request.as_bytes()).await?;
            stream.flush().await
        };
        bounded(io_timeout, write).await.ok_or(CommandError::Timeout)??;

        let mut lines = Vec::new();
        loop {
            let buf = bounded(io_timeout, read_line_lossy(stream))
                .await
                .ok_or(CommandError::Timeout)??
                .ok_or(CommandError::Closed)?;

            match ReplyLine::classify(buf.trim()) {
                ReplyLine::Ok => return Ok(lines),
                ReplyLine::Ack(detail) => return Err(CommandError::Ack(detail.to_string())),
                ReplyLine::Data(data) => lines.push(data.to_string()),
            }
        }
    }

    /// Release the socket. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            debug!("MPD connection to {} closed", self.addr);
        }
    }
}
