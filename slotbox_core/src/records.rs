use crate::config::Limits;
use crate::reader::{ByteReader, ReaderError};
use crate::stats::{Aggregate, StatsError};

/// Result of scanning a nested binary record database:
///
/// ```text
/// [u32 record_count]
///   per record: [u32 field_count]
///     per field: [u32 len][len payload bytes]
/// ```
///
/// A record is kept only if every one of its fields arrived complete; a
/// fault mid-record discards that partial record and stops the scan.
#[derive(Debug)]
pub struct RecordScan {
    pub records: Vec<Vec<Vec<u8>>>,
    pub fault: Option<ReaderError>,
}

impl RecordScan {
    /// Mean field count over completely-read records.
    pub fn average_field_count(&self) -> Result<i64, StatsError> {
        let mut agg = Aggregate::new();
        for record in &self.records {
            agg.push(record.len() as i64);
        }
        agg.mean()
    }

    /// First field of the first record, capped to 50 bytes for display.
    pub fn first_field_preview(&self) -> Option<&[u8]> {
        self.records
            .iter()
            .find(|record| !record.is_empty())
            .map(|record| {
                let field = &record[0];
                &field[..field.len().min(50)]
            })
    }
}

pub fn scan(bytes: &[u8], limits: &Limits) -> RecordScan {
    let mut reader = ByteReader::new(bytes);
    let mut scan = RecordScan {
        records: Vec::new(),
        fault: None,
    };

    let record_count = match reader.read_count(limits.max_records) {
        Ok(count) => count,
        Err(e) => {
            scan.fault = Some(e);
            return scan;
        }
    };

    'records: for _ in 0..record_count {
        let field_count = match reader.read_count(limits.max_records) {
            Ok(count) => count,
            Err(e) => {
                scan.fault = Some(e);
                break;
            }
        };

        let mut fields = Vec::new();
        for _ in 0..field_count {
            match reader.read_len_prefixed(limits.max_field_len) {
                Ok(payload) => fields.push(payload.to_vec()),
                Err(e) => {
                    // The partial record is discarded, not half-kept.
                    scan.fault = Some(e);
                    break 'records;
                }
            }
        }
        scan.records.push(fields);
    }

    scan
}
