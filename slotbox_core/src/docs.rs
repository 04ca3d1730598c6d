use crate::config::Limits;
use crate::reader::{ByteReader, ReaderError};
use crate::stats::{Aggregate, StatsError};

/// Result of scanning a length-prefixed document blob:
///
/// ```text
/// [u32 count] then per document: [u32 len][len payload bytes]
/// ```
///
/// Documents read before a fault are kept; the fault itself is recorded so
/// a short payload is never passed off as complete.
#[derive(Debug)]
pub struct DocScan {
    pub docs: Vec<Vec<u8>>,
    pub fault: Option<ReaderError>,
}

impl DocScan {
    pub fn average_len(&self) -> Result<i64, StatsError> {
        let mut agg = Aggregate::new();
        for doc in &self.docs {
            agg.push(doc.len() as i64);
        }
        agg.mean()
    }

    /// First document payload, capped to 100 bytes for display.
    pub fn first_preview(&self) -> Option<&[u8]> {
        self.docs.first().map(|doc| &doc[..doc.len().min(100)])
    }
}

/// Scans the blob, stopping at the first fault. Storage is only ever sized
/// by payload bytes actually present, never by a declared count.
pub fn scan(bytes: &[u8], limits: &Limits) -> DocScan {
    let mut reader = ByteReader::new(bytes);
    let mut scan = DocScan {
        docs: Vec::new(),
        fault: None,
    };

    let declared = match reader.read_count(limits.max_records) {
        Ok(count) => count,
        Err(e) => {
            scan.fault = Some(e);
            return scan;
        }
    };

    for _ in 0..declared {
        match reader.read_len_prefixed(limits.max_field_len) {
            Ok(payload) => scan.docs.push(payload.to_vec()),
            Err(e) => {
                scan.fault = Some(e);
                break;
            }
        }
    }

    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(docs: &[&[u8]]) -> Vec<u8> {
        let mut out = (docs.len() as u32).to_le_bytes().to_vec();
        for doc in docs {
            out.extend_from_slice(&(doc.len() as u32).to_le_bytes());
            out.extend_from_slice(doc);
        }
        out
    }

    #[test]
    fn well_formed_blob_round_trips() {
        let bytes = blob(&[b"Hello", b"worlds!"]);
        let scan = scan(&bytes, &Limits::default());
        assert!(scan.fault.is_none());
        assert_eq!(scan.docs.len(), 2);
        assert_eq!(scan.average_len().unwrap(), 6);
        assert_eq!(scan.first_preview().unwrap(), b"Hello");
    }

    #[test]
    fn empty_input_is_a_fault_and_empty_aggregate() {
        let scan = scan(&[], &Limits::default());
        assert!(matches!(
            scan.fault,
            Some(ReaderError::TruncatedInput { .. })
        ));
        assert_eq!(scan.average_len(), Err(StatsError::EmptyAggregate));
        assert!(scan.first_preview().is_none());
    }

    #[test]
    fn truncated_document_keeps_earlier_documents() {
        let mut bytes = blob(&[b"ok"]);
        // Rewrite the count to promise a second document that is cut short.
        bytes[0..4].copy_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(b"short");

        let scan = scan(&bytes, &Limits::default());
        assert_eq!(scan.docs.len(), 1);
        assert!(matches!(
            scan.fault,
            Some(ReaderError::TruncatedInput {
                needed: 100,
                available: 5
            })
        ));
    }

    #[test]
    fn count_over_cap_is_rejected_before_any_read() {
        let bytes = u32::MAX.to_le_bytes();
        let scan = scan(&bytes, &Limits::default());
        assert!(matches!(
            scan.fault,
            Some(ReaderError::LengthOverflow { .. })
        ));
        assert!(scan.docs.is_empty());
    }

    #[test]
    fn document_length_over_cap_is_rejected() {
        let limits = Limits {
            max_field_len: 4,
            ..Limits::default()
        };
        let bytes = blob(&[b"toolong"]);
        let scan = scan(&bytes, &limits);
        assert!(matches!(
            scan.fault,
            Some(ReaderError::LengthOverflow {
                requested: 7,
                max: 4
            })
        ));
    }

    #[test]
    fn declared_count_larger_than_stream_truncates() {
        let mut bytes = 3u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(b"ab");
        // Stream ends after one of the three promised documents.
        let scan = scan(&bytes, &Limits::default());
        assert_eq!(scan.docs.len(), 1);
        assert!(matches!(
            scan.fault,
            Some(ReaderError::TruncatedInput { .. })
        ));
    }
}
