//! Betwire client runtime
//!
//! Drives a whole agency session over one connection: the bets stream out
//! in batches with an acknowledgment each, and a winners query ends the
//! session. A shutdown signal can interrupt either phase, and the
//! connection is closed exactly once on every exit path.

use std::future::Future;
use thiserror::Error;

use super::connection::{Connection, ConnectionError};
use super::ClientConfig;
use crate::protocol::Batcher;
use crate::source::{BetSource, SourceError};

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("Bet source error: {0}")]
    Source(#[from] SourceError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Client state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Not yet started
    Idle,
    /// Dialing the server
    Connecting,
    /// Streaming batch frames
    Submitting,
    /// Waiting on the winners response
    QueryingWinners,
    /// Submission failed; the winners query was skipped
    Aborted,
    /// Connection closed, run over
    Closed,
}

/// How a run ended, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every bet was submitted and acknowledged. `winners` is None when
    /// the query failed; that is reported, not fatal.
    Completed {
        records: u64,
        frames: u64,
        winners: Option<u64>,
    },
    /// A shutdown signal interrupted the run
    Cancelled,
}

/// Counts carried out of the submission phase
#[derive(Debug, Clone, Copy, Default)]
struct SubmitSummary {
    records: u64,
    frames: u64,
}

/// Betwire client
pub struct Client {
    /// Client configuration
    config: ClientConfig,
    /// Current state
    state: ClientState,
}

impl Client {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            state: ClientState::Idle,
        }
    }

    /// Get the current state
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Run one full session: connect, submit every bet, query the
    /// winners, close.
    ///
    /// `shutdown` is an externally owned signal; when it resolves, the
    /// phase in flight is abandoned at its current await point and the
    /// connection is closed right away. A cancelled run is a normal
    /// outcome, not an error.
    pub async fn run<B, F>(&mut self, source: &mut B, shutdown: F) -> ClientResult<RunOutcome>
    where
        B: BetSource,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.state = ClientState::Connecting;
        let mut conn = Connection::connect(&self.config.server_address)
            .await
            .map_err(|source| ClientError::Connect {
                addr: self.config.server_address.clone(),
                source,
            })?;

        tracing::info!(
            "Connected to {} as agency {}",
            self.config.server_address,
            self.config.agency_id
        );

        self.state = ClientState::Submitting;
        let submitted = tokio::select! {
            result = submit_bets(&self.config, &mut conn, source) => result,
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, abandoning submission");
                conn.close().await;
                self.state = ClientState::Closed;
                return Ok(RunOutcome::Cancelled);
            }
        };

        let summary = match submitted {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Submission failed, skipping winners query: {}", e);
                self.state = ClientState::Aborted;
                conn.close().await;
                self.state = ClientState::Closed;
                return Err(e);
            }
        };

        tracing::info!(
            "Submitted {} bets in {} frames",
            summary.records,
            summary.frames
        );

        self.state = ClientState::QueryingWinners;
        let winners = tokio::select! {
            result = conn.query_winners(self.config.agency_id) => match result {
                Ok(count) => {
                    tracing::info!("Agency {} has {} winners", self.config.agency_id, count);
                    Some(count)
                }
                Err(e) => {
                    // The bets are already acknowledged; a failed query
                    // does not fail the run.
                    tracing::error!("Winners query failed: {}", e);
                    None
                }
            },
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, abandoning winners query");
                conn.close().await;
                self.state = ClientState::Closed;
                return Ok(RunOutcome::Cancelled);
            }
        };

        conn.close().await;
        self.state = ClientState::Closed;

        Ok(RunOutcome::Completed {
            records: summary.records,
            frames: summary.frames,
            winners,
        })
    }
}

/// Stream every bet from the source, flushing a frame per full batch and
/// one more for the remainder.
async fn submit_bets<B: BetSource>(
    config: &ClientConfig,
    conn: &mut Connection,
    source: &mut B,
) -> ClientResult<SubmitSummary> {
    let mut batcher = Batcher::new(config.agency_id, config.batch_size);
    let mut summary = SubmitSummary::default();

    while let Some(bet) = source.next_bet()? {
        summary.records += 1;
        if let Some(payload) = batcher.push(&bet) {
            flush_frame(conn, &payload, &mut summary).await?;
        }
    }

    if let Some(payload) = batcher.finish() {
        flush_frame(conn, &payload, &mut summary).await?;
    }

    Ok(summary)
}

async fn flush_frame(
    conn: &mut Connection,
    payload: &[u8],
    summary: &mut SubmitSummary,
) -> ClientResult<()> {
    let ack = conn.send_frame(payload).await?;
    summary.frames += 1;
    tracing::debug!("Frame {} acknowledged: {}", summary.frames, ack);
    Ok(())
}
