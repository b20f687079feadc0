//! Connection handling for the draw service
//!
//! One TCP connection carries a whole session:
//! - Batch frames, each answered by a fixed-size acknowledgment
//! - The winners query and its line-per-winner response
//! - A close that is safe to repeat

use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::{winners_request, Ack, WireError, ACK_LEN, MAX_FRAME_LEN, WINNERS_REQUEST_LEN};

/// Connection errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Wire format error: {0}")]
    Wire(#[from] WireError),

    #[error("Connection closed by server")]
    Closed,
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Connection statistics
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Batch frames sent
    pub frames_sent: u64,
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
}

/// Represents a connection to the draw service.
///
/// Generic over the stream so the wire behavior can be pinned down
/// against scripted I/O in tests; production uses `TcpStream`.
pub struct Connection<S = TcpStream> {
    /// The underlying stream
    stream: S,
    /// Whether close() already ran
    closed: bool,
    /// Statistics
    stats: ConnectionStats,
}

impl Connection<TcpStream> {
    /// Dial the draw service.
    ///
    /// No retry and no backoff: without the connection there is nothing
    /// for the client to do, so the caller decides what a failure means.
    pub async fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wrap an established stream
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            closed: false,
            stats: ConnectionStats::default(),
        }
    }

    /// Send one batch frame and read its acknowledgment.
    ///
    /// Both the length prefix and the payload go out through `write_all`,
    /// so a frame is either fully written or the send fails; there is no
    /// partial-frame state to resynchronize from.
    pub async fn send_frame(&mut self, payload: &[u8]) -> ConnectionResult<Ack> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(WireError::FrameTooLarge(payload.len(), MAX_FRAME_LEN).into());
        }

        let prefix = (payload.len() as u16).to_be_bytes();
        self.stream.write_all(&prefix).await?;
        self.stream.write_all(payload).await?;
        self.stream.flush().await?;

        self.stats.frames_sent += 1;
        self.stats.bytes_sent += (prefix.len() + payload.len()) as u64;

        let mut ack = [0u8; ACK_LEN];
        self.stream.read_exact(&mut ack).await.map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ConnectionError::Closed
            } else {
                ConnectionError::Io(e)
            }
        })?;
        self.stats.bytes_received += ACK_LEN as u64;

        Ok(Ack(ack))
    }

    /// Ask for this agency's winners and count the response lines.
    ///
    /// The server answers with one line per winning bet and closes the
    /// stream when done; end of stream is the success signal here, not a
    /// failure. A final line the server left unterminated still counts.
    pub async fn query_winners(&mut self, agency: u16) -> ConnectionResult<u64> {
        self.stream.write_all(&winners_request(agency)).await?;
        self.stream.flush().await?;
        self.stats.bytes_sent += WINNERS_REQUEST_LEN as u64;

        let mut winners = 0u64;
        let mut partial_line = false;
        let mut chunk = [0u8; 4096];

        loop {
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            self.stats.bytes_received += n as u64;

            for &byte in &chunk[..n] {
                if byte == b'\n' {
                    winners += 1;
                    partial_line = false;
                } else {
                    partial_line = true;
                }
            }
        }

        if partial_line {
            winners += 1;
        }

        Ok(winners)
    }

    /// Shut the connection down.
    ///
    /// Safe to call more than once; only the first call touches the
    /// socket, and a shutdown failure is ignored since the session is
    /// over either way.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.stream.shutdown().await;
    }

    /// Get connection statistics
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }
}
