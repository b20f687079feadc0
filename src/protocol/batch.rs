//! Batch assembly
//!
//! Encoded records accumulate in one buffer until the configured per-batch
//! count is reached; the filled payload is handed back for framing and the
//! buffer starts over empty. Assembly is count-driven; the 2-byte frame
//! ceiling is enforced by the connection when the payload is sent.

use bytes::{Bytes, BytesMut};

use super::record::Bet;

/// Accumulates encoded bets into frame payloads.
pub struct Batcher {
    agency: u16,
    max_records: usize,
    buf: BytesMut,
    pending: usize,
}

impl Batcher {
    /// Create an assembler that flushes after `max_records` bets.
    ///
    /// `agency` is injected into every record as the leading field.
    pub fn new(agency: u16, max_records: usize) -> Self {
        debug_assert!(max_records >= 1, "batch size must be at least 1");
        Self {
            agency,
            max_records,
            buf: BytesMut::new(),
            pending: 0,
        }
    }

    /// Encode one bet into the current batch.
    ///
    /// Returns the completed payload once the batch holds `max_records`
    /// records; a record is never split across two payloads.
    pub fn push(&mut self, bet: &Bet) -> Option<Bytes> {
        bet.encode(self.agency, &mut self.buf);
        self.pending += 1;

        if self.pending == self.max_records {
            Some(self.take())
        } else {
            None
        }
    }

    /// Hand back whatever is buffered, if anything.
    ///
    /// Called at end of input so a final short batch is not lost. Empty
    /// input produces no payload at all; a zero-length frame would read
    /// as the end-of-submissions marker on the wire.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.pending == 0 {
            None
        } else {
            Some(self.take())
        }
    }

    /// Records buffered but not yet flushed
    pub fn pending(&self) -> usize {
        self.pending
    }

    fn take(&mut self) -> Bytes {
        self.pending = 0;
        self.buf.split().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_record;
    use bytes::BytesMut;

    fn bet(n: u32) -> Bet {
        Bet {
            first_name: format!("First{}", n),
            last_name: format!("Last{}", n),
            document: format!("{}", 30000000 + n),
            birthdate: "1999-03-17".to_string(),
            number: n,
        }
    }

    fn record_count(payload: &Bytes) -> usize {
        let mut buf = BytesMut::from(&payload[..]);
        let mut count = 0;
        while !buf.is_empty() {
            decode_record(&mut buf)
                .expect("valid record")
                .expect("complete record");
            count += 1;
        }
        count
    }

    #[test]
    fn test_flushes_at_batch_size() {
        let mut batcher = Batcher::new(1, 2);

        assert!(batcher.push(&bet(1)).is_none());
        let full = batcher.push(&bet(2)).expect("second push fills the batch");
        assert_eq!(record_count(&full), 2);
        assert_eq!(batcher.pending(), 0);
    }

    #[test]
    fn test_finish_flushes_remainder() {
        // Three records at batch size two: one full payload, one short one.
        let mut batcher = Batcher::new(1, 2);

        assert!(batcher.push(&bet(1)).is_none());
        let first = batcher.push(&bet(2)).unwrap();
        assert!(batcher.push(&bet(3)).is_none());
        let second = batcher.finish().expect("remainder flushes");

        assert_eq!(record_count(&first), 2);
        assert_eq!(record_count(&second), 1);
        assert!(batcher.finish().is_none());
    }

    #[test]
    fn test_exact_multiple_leaves_nothing() {
        let mut batcher = Batcher::new(1, 3);
        let mut payloads = Vec::new();

        for n in 1..=6 {
            if let Some(payload) = batcher.push(&bet(n)) {
                payloads.push(payload);
            }
        }

        assert_eq!(payloads.len(), 2);
        assert!(batcher.finish().is_none(), "no empty trailing payload");
    }

    #[test]
    fn test_empty_input_produces_nothing() {
        let mut batcher = Batcher::new(1, 100);
        assert!(batcher.finish().is_none());
        assert_eq!(batcher.pending(), 0);
    }

    #[test]
    fn test_batch_size_one_flushes_every_push() {
        let mut batcher = Batcher::new(1, 1);
        for n in 1..=3 {
            let payload = batcher.push(&bet(n)).expect("every push flushes");
            assert_eq!(record_count(&payload), 1);
        }
    }

    #[test]
    fn test_payload_count_is_ceiling_of_records_over_batch() {
        for (records, batch, expected) in
            [(0usize, 5usize, 0usize), (1, 5, 1), (5, 5, 1), (6, 5, 2), (11, 5, 3), (10, 3, 4)]
        {
            let mut batcher = Batcher::new(4, batch);
            let mut payloads = 0;
            let mut decoded = 0;

            for n in 0..records {
                if let Some(payload) = batcher.push(&bet(n as u32)) {
                    payloads += 1;
                    decoded += record_count(&payload);
                }
            }
            if let Some(payload) = batcher.finish() {
                payloads += 1;
                decoded += record_count(&payload);
            }

            assert_eq!(payloads, expected, "{} records at batch {}", records, batch);
            assert_eq!(decoded, records, "no record lost or duplicated");
        }
    }

    #[test]
    fn test_records_keep_submission_order() {
        let mut batcher = Batcher::new(9, 2);
        let mut numbers = Vec::new();

        let mut collect = |payload: Bytes| {
            let mut buf = BytesMut::from(&payload[..]);
            while let Some(fields) = decode_record(&mut buf).unwrap() {
                assert_eq!(fields[0], "9", "agency injected on every record");
                numbers.push(fields[5].clone());
            }
        };

        for n in [10u32, 20, 30] {
            if let Some(payload) = batcher.push(&bet(n)) {
                collect(payload);
            }
        }
        if let Some(payload) = batcher.finish() {
            collect(payload);
        }

        assert_eq!(numbers, vec!["10", "20", "30"]);
    }
}
