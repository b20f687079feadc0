//! Bet record encoding and decoding
//!
//! A packed record is an offset table followed by the field bytes: one
//! 2-byte big-endian cumulative end offset per field, then every field
//! concatenated with no padding. The first field starts right after the
//! table, so its start offset is implicit (2 x field count); each field's
//! boundaries fall out of subtracting consecutive table entries.

use bytes::{BufMut, BytesMut};
use thiserror::Error;

use super::{FIELD_COUNT, HEADER_SIZE};

/// Wire format errors
#[derive(Error, Debug)]
pub enum WireError {
    #[error("Frame too large: {0} bytes (max: {1})")]
    FrameTooLarge(usize, usize),

    #[error("Record offset table is not monotonic")]
    BadOffsets,

    #[error("Record field is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A single bet as read from an agency data file.
///
/// The agency id is not part of the struct; it belongs to the client as a
/// whole and is injected as the leading record field when encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    pub first_name: String,
    pub last_name: String,
    pub document: String,
    pub birthdate: String,
    pub number: u32,
}

impl Bet {
    /// Append this bet to `buf` as one packed record.
    ///
    /// Numeric fields travel as decimal text like everything else.
    /// Encoding into the growable buffer cannot fail; size limits are
    /// enforced when a full frame is handed to the connection.
    pub fn encode(&self, agency: u16, buf: &mut BytesMut) {
        let agency = agency.to_string();
        let number = self.number.to_string();
        encode_record(
            &[
                agency.as_str(),
                self.first_name.as_str(),
                self.last_name.as_str(),
                self.document.as_str(),
                self.birthdate.as_str(),
                number.as_str(),
            ],
            buf,
        );
    }
}

/// Append one packed record to `buf`.
///
/// Offsets are computed in `usize` and truncated to `u16` at write time;
/// a record big enough to wrap them also exceeds the frame ceiling and is
/// rejected before it reaches the socket.
pub fn encode_record(fields: &[&str; FIELD_COUNT], buf: &mut BytesMut) {
    let total: usize = fields.iter().map(|f| f.len()).sum();
    buf.reserve(HEADER_SIZE + total);

    let mut end = HEADER_SIZE;
    for field in fields {
        end += field.len();
        buf.put_u16(end as u16);
    }
    for field in fields {
        buf.put_slice(field.as_bytes());
    }
}

/// Attempt to decode one record from the front of `buf`, consuming it.
///
/// Returns Ok(None) if more data is needed. This is the server-side view
/// of the format; the client itself only encodes, but tests and fixtures
/// use it to verify frames byte by byte.
pub fn decode_record(buf: &mut BytesMut) -> Result<Option<[String; FIELD_COUNT]>, WireError> {
    if buf.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut ends = [0usize; FIELD_COUNT];
    for (i, end) in ends.iter_mut().enumerate() {
        *end = u16::from_be_bytes([buf[2 * i], buf[2 * i + 1]]) as usize;
    }

    // Equal neighbors are legal (empty field), decreasing ones are not.
    let mut start = HEADER_SIZE;
    for &end in &ends {
        if end < start {
            return Err(WireError::BadOffsets);
        }
        start = end;
    }

    let total = ends[FIELD_COUNT - 1];
    if buf.len() < total {
        return Ok(None);
    }

    let record = buf.split_to(total);
    let mut fields: [String; FIELD_COUNT] = std::array::from_fn(|_| String::new());
    let mut start = HEADER_SIZE;
    for (i, &end) in ends.iter().enumerate() {
        fields[i] = String::from_utf8(record[start..end].to_vec())?;
        start = end;
    }

    Ok(Some(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(fields: [&str; FIELD_COUNT]) -> [String; FIELD_COUNT] {
        fields.map(String::from)
    }

    #[test]
    fn test_record_roundtrip() {
        let fields = ["1", "Santiago Lionel", "Lorca", "30904465", "1999-03-17", "7574"];
        let mut buf = BytesMut::new();
        encode_record(&fields, &mut buf);

        let decoded = decode_record(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, owned(fields));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_record_roundtrip_empty_fields() {
        let fields = ["3", "", "O'Neil", "", "1970-01-01", "0"];
        let mut buf = BytesMut::new();
        encode_record(&fields, &mut buf);

        let decoded = decode_record(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, owned(fields));
    }

    #[test]
    fn test_record_known_bytes() {
        // Six single-byte fields: offsets run 13..=18 after the 12-byte table.
        let mut buf = BytesMut::new();
        encode_record(&["1", "a", "b", "c", "d", "7"], &mut buf);

        assert_eq!(
            &buf[..],
            &[
                0x00, 0x0D, 0x00, 0x0E, 0x00, 0x0F, 0x00, 0x10, 0x00, 0x11, 0x00, 0x12, b'1',
                b'a', b'b', b'c', b'd', b'7',
            ]
        );
    }

    #[test]
    fn test_offsets_increase_with_nonempty_fields() {
        let mut buf = BytesMut::new();
        encode_record(&["12", "Juan", "Perez", "28301456", "1990-01-01", "42"], &mut buf);

        let mut prev = HEADER_SIZE;
        let mut sum = HEADER_SIZE;
        for i in 0..FIELD_COUNT {
            let end = u16::from_be_bytes([buf[2 * i], buf[2 * i + 1]]) as usize;
            assert!(end > prev, "offset {} not increasing", i);
            prev = end;
            sum = end;
        }
        assert_eq!(sum, buf.len());
    }

    #[test]
    fn test_partial_record_needs_more_data() {
        let fields = ["1", "Ana", "Diaz", "20555333", "1985-12-30", "911"];
        let mut full = BytesMut::new();
        encode_record(&fields, &mut full);

        // Neither a truncated table nor a truncated payload yields a record.
        for cut in [0, 1, HEADER_SIZE - 1, HEADER_SIZE, full.len() - 1] {
            let mut partial = BytesMut::from(&full[..cut]);
            assert!(decode_record(&mut partial).unwrap().is_none());
            assert_eq!(partial.len(), cut, "partial decode must not consume");
        }
    }

    #[test]
    fn test_decreasing_offsets_rejected() {
        let mut buf = BytesMut::new();
        for end in [14u16, 13, 15, 16, 17, 18] {
            buf.put_u16(end);
        }
        buf.put_slice(b"xxxxxx");

        assert!(matches!(
            decode_record(&mut buf),
            Err(WireError::BadOffsets)
        ));
    }

    #[test]
    fn test_offset_below_table_rejected() {
        let mut buf = BytesMut::new();
        for end in [4u16, 13, 14, 15, 16, 17] {
            buf.put_u16(end);
        }
        buf.put_slice(b"xxxxx");

        assert!(matches!(
            decode_record(&mut buf),
            Err(WireError::BadOffsets)
        ));
    }

    #[test]
    fn test_bet_encode_injects_agency() {
        let bet = Bet {
            first_name: "Maria Jose".to_string(),
            last_name: "Gomez".to_string(),
            document: "31660107".to_string(),
            birthdate: "2000-05-24".to_string(),
            number: 2,
        };

        let mut buf = BytesMut::new();
        bet.encode(7, &mut buf);

        let decoded = decode_record(&mut buf).unwrap().unwrap();
        assert_eq!(
            decoded,
            owned(["7", "Maria Jose", "Gomez", "31660107", "2000-05-24", "2"])
        );
    }

    #[test]
    fn test_sequential_records_decode_in_order() {
        let mut buf = BytesMut::new();
        encode_record(&["1", "A", "B", "1", "1990-01-01", "10"], &mut buf);
        encode_record(&["1", "C", "D", "2", "1991-02-02", "20"], &mut buf);

        let first = decode_record(&mut buf).unwrap().unwrap();
        let second = decode_record(&mut buf).unwrap().unwrap();
        assert_eq!(first[1], "A");
        assert_eq!(second[1], "C");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_arbitrary_text_roundtrip() {
        // Commas, quotes and multi-byte UTF-8 all travel verbatim.
        let fields = ["5", "José, \"Pepe\"", "Ñandú", "x'--;", "2001-09-09", "999"];
        let mut buf = BytesMut::new();
        encode_record(&fields, &mut buf);

        let decoded = decode_record(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, owned(fields));
    }
}
