use thiserror::Error;

/// Errors raised while extracting fields from raw input.
///
/// All of these are recoverable at the scope of one record or command: the
/// caller reports them and moves on to the next input unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// A declared length or count exceeds the bytes actually available.
    #[error("truncated input: need {needed} more bytes, {available} available")]
    TruncatedInput { needed: usize, available: usize },

    /// A declared length, count, or size is negative or exceeds its
    /// configured maximum. Fails closed before any allocation or copy.
    #[error("length {requested} out of range (max {max})")]
    LengthOverflow { requested: i64, max: usize },

    /// A token consumed as an index, size, or operand is not an integer.
    #[error("not a number: {0:?}")]
    NotANumber(String),
}

/// Validates an attacker-controlled size or count and converts it to `usize`.
///
/// This is the single chokepoint between a declared value and an allocation
/// sized by it: negative and over-cap requests fail with `LengthOverflow`.
pub fn checked_len(requested: i64, max: usize) -> Result<usize, ReaderError> {
    if requested < 0 {
        return Err(ReaderError::LengthOverflow { requested, max });
    }
    let len = requested as u64;
    if len > max as u64 {
        return Err(ReaderError::LengthOverflow { requested, max });
    }
    Ok(len as usize)
}

/// Parses an integer token, trimming surrounding whitespace first.
///
/// Unlike the `atoi` habit this replaces, a malformed token is an error and
/// never silently becomes zero.
pub fn parse_i64(token: &str) -> Result<i64, ReaderError> {
    let trimmed = token.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| ReaderError::NotANumber(trimmed.to_string()))
}

/// Splits a line on `delimiter`, preserving empty fields.
pub fn split_fields(line: &str, delimiter: char) -> Vec<&str> {
    line.split(delimiter).collect()
}

/// Splits a line on runs of whitespace, the way the command frontends
/// tokenize.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Cursor over a byte buffer yielding little-endian `u32` prefixes and
/// length-prefixed payload views.
///
/// Payloads are borrowed from the underlying buffer; the reader never
/// allocates storage sized by a declared value.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads a little-endian `u32` prefix.
    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        if self.remaining() < 4 {
            return Err(ReaderError::TruncatedInput {
                needed: 4,
                available: self.remaining(),
            });
        }
        let bytes = [
            self.buf[self.pos],
            self.buf[self.pos + 1],
            self.buf[self.pos + 2],
            self.buf[self.pos + 3],
        ];
        self.pos += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a `u32` count prefix and validates it against `max`.
    pub fn read_count(&mut self, max: usize) -> Result<usize, ReaderError> {
        let count = self.read_u32()?;
        checked_len(i64::from(count), max)
    }

    /// Borrows exactly `len` bytes, or fails with `TruncatedInput` without
    /// consuming anything.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ReaderError> {
        if self.remaining() < len {
            return Err(ReaderError::TruncatedInput {
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads a `u32` length prefix validated against `max_len`, then borrows
    /// that many payload bytes. The payload is never shorter than declared:
    /// a short buffer fails with `TruncatedInput`.
    pub fn read_len_prefixed(&mut self, max_len: usize) -> Result<&'a [u8], ReaderError> {
        let declared = self.read_u32()?;
        let len = checked_len(i64::from(declared), max_len)?;
        self.read_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_len_rejects_negative_and_oversized() {
        assert!(matches!(
            checked_len(-1, 100),
            Err(ReaderError::LengthOverflow {
                requested: -1,
                max: 100
            })
        ));
        assert!(matches!(
            checked_len(101, 100),
            Err(ReaderError::LengthOverflow { .. })
        ));
        assert_eq!(checked_len(100, 100).unwrap(), 100);
        assert_eq!(checked_len(0, 100).unwrap(), 0);
    }

    #[test]
    fn parse_i64_never_defaults() {
        assert_eq!(parse_i64(" 42 ").unwrap(), 42);
        assert_eq!(parse_i64("-7").unwrap(), -7);
        assert!(matches!(parse_i64("42x"), Err(ReaderError::NotANumber(_))));
        assert!(matches!(parse_i64(""), Err(ReaderError::NotANumber(_))));
        assert!(matches!(
            parse_i64("99999999999999999999999"),
            Err(ReaderError::NotANumber(_))
        ));
    }

    #[test]
    fn split_fields_preserves_empty_fields() {
        assert_eq!(split_fields("a,,c", ','), vec!["a", "", "c"]);
        assert_eq!(split_fields("x|y|z", '|'), vec!["x", "y", "z"]);
    }

    #[test]
    fn byte_reader_reads_le_u32() {
        let mut reader = ByteReader::new(&[0x05, 0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(reader.read_u32().unwrap(), 5);
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn byte_reader_truncated_u32_reports_available_bytes() {
        let mut reader = ByteReader::new(&[0x05, 0x00]);
        match reader.read_u32() {
            Err(ReaderError::TruncatedInput { needed, available }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected TruncatedInput, got {other:?}"),
        }
    }

    #[test]
    fn read_len_prefixed_happy_path() {
        let mut data = 5u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"Hello");
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_len_prefixed(1024).unwrap(), b"Hello");
        assert!(reader.is_empty());
    }

    #[test]
    fn read_len_prefixed_declared_longer_than_available_is_truncated() {
        let mut data = 10u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"Hi");
        let mut reader = ByteReader::new(&data);
        match reader.read_len_prefixed(1024) {
            Err(ReaderError::TruncatedInput { needed, available }) => {
                assert_eq!(needed, 10);
                assert_eq!(available, 2);
            }
            other => panic!("expected TruncatedInput, got {other:?}"),
        }
    }

    #[test]
    fn read_len_prefixed_rejects_length_over_cap_before_reading() {
        let mut data = 0xFFFF_FFFFu32.to_le_bytes().to_vec();
        data.extend_from_slice(b"payload");
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            reader.read_len_prefixed(1024),
            Err(ReaderError::LengthOverflow { .. })
        ));
    }

    #[test]
    fn read_count_applies_the_cap() {
        let data = 70_000u32.to_le_bytes();
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            reader.read_count(1 << 16),
            Err(ReaderError::LengthOverflow { .. })
        ));

        let data = 9u32.to_le_bytes();
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_count(1 << 16).unwrap(), 9);
    }
}
