//! Protocol module - Defines the wire protocol for the lottery draw service
//!
//! Three shapes travel over one TCP connection, in order:
//! - Batch frames: 2 bytes payload length (big-endian) + packed bet records
//! - A fixed 7-byte acknowledgment answering every frame
//! - The winners query: two zero bytes + 2 bytes agency id (big-endian),
//!   answered with newline-separated winner documents until the server
//!   closes the stream
//!
//! The server treats a zero length prefix as the end of submissions, which
//! is why the winners query leads with two zero bytes.

mod batch;
mod record;

pub use batch::*;
pub use record::*;

/// Fields per packed record, the injected agency id included
pub const FIELD_COUNT: usize = 6;

/// Offset table size preceding a record's packed fields
pub const HEADER_SIZE: usize = FIELD_COUNT * 2;

/// Acknowledgment size in bytes
pub const ACK_LEN: usize = 7;

/// Largest payload the 2-byte length prefix can describe
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Winners query size in bytes
pub const WINNERS_REQUEST_LEN: usize = 4;

/// Default port for the draw service
pub const DEFAULT_PORT: u16 = 12345;

/// Fixed-size acknowledgment read back after each frame.
///
/// The payload is status text owned by the server; the client logs it and
/// never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack(pub [u8; ACK_LEN]);

impl Ack {
    /// Status text, lossily decoded for logging
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// Build the winners query for an agency.
///
/// Bytes 0-1 are always zero (an empty batch frame, marking the end of
/// submissions), bytes 2-3 carry the agency id big-endian.
pub fn winners_request(agency: u16) -> [u8; WINNERS_REQUEST_LEN] {
    let mut msg = [0u8; WINNERS_REQUEST_LEN];
    msg[2..].copy_from_slice(&agency.to_be_bytes());
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winners_request_layout() {
        let msg = winners_request(0x1234);
        assert_eq!(msg, [0x00, 0x00, 0x12, 0x34]);
    }

    #[test]
    fn test_winners_request_leads_with_empty_frame() {
        for agency in [0u16, 1, 5, u16::MAX] {
            let msg = winners_request(agency);
            assert_eq!(&msg[..2], &[0x00, 0x00]);
            assert_eq!(u16::from_be_bytes([msg[2], msg[3]]), agency);
        }
    }

    #[test]
    fn test_ack_text() {
        let ack = Ack(*b"success");
        assert_eq!(ack.as_text(), "success");
        assert_eq!(format!("{}", ack), "success");
    }
}
