//! Network module - The client side of the draw service protocol
//!
//! Provides:
//! - Connection: framed transport with acknowledgments and the winners
//!   exchange
//! - Client: the runtime driving a whole submission session

mod client;
mod connection;

pub use client::*;
pub use connection::*;

/// Everything the runtime needs to know, assembled by the configuration
/// layer and the CLI.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Draw service address, `host:port`
    pub server_address: String,
    /// Agency this client submits for; injected into every record and
    /// named in the winners query
    pub agency_id: u16,
    /// Bets per batch frame
    pub batch_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: format!("127.0.0.1:{}", crate::protocol::DEFAULT_PORT),
            agency_id: 1,
            batch_size: 100,
        }
    }
}
