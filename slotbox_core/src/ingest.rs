use crate::config::Limits;
use crate::reader;
use crate::session::{CommandError, LineInterpreter};
use crate::stats::Aggregate;

/// Shape of one delimited-text record stream.
///
/// The comma-separated `name,age,email` roster and the pipe-separated
/// `TITLE|AUTHOR|YEAR` shelf are the same parser with different schemas.
#[derive(Debug, Clone)]
pub struct IngestSchema {
    pub delimiter: char,
    pub field_count: usize,
    /// Zero-based position of the field aggregated at end of input.
    pub numeric_field: usize,
    /// Human label for the aggregated field ("age", "year", …).
    pub label: String,
}

impl IngestSchema {
    /// `name,age,email` records.
    pub fn roster() -> Self {
        Self {
            delimiter: ',',
            field_count: 3,
            numeric_field: 1,
            label: "age".to_string(),
        }
    }

    /// `TITLE|AUTHOR|YEAR` records.
    pub fn shelf() -> Self {
        Self {
            delimiter: '|',
            field_count: 3,
            numeric_field: 2,
            label: "year".to_string(),
        }
    }
}

/// Accumulating frontend for delimited records: every line is one record,
/// the summary comes at end of input.
#[derive(Debug)]
pub struct IngestInterpreter {
    schema: IngestSchema,
    rows: Vec<Vec<String>>,
    numbers: Aggregate,
    max_rows: usize,
}

impl IngestInterpreter {
    pub fn new(schema: IngestSchema, limits: &Limits) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            numbers: Aggregate::new(),
            max_rows: limits.max_records,
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

impl LineInterpreter for IngestInterpreter {
    fn eval_line(&mut self, line: &str) -> Result<Option<String>, CommandError> {
        let fields = reader::split_fields(line, self.schema.delimiter);
        if fields.len() < self.schema.field_count {
            return Err(CommandError::BadArity {
                command: "record".to_string(),
                expected: self.schema.field_count,
                got: fields.len(),
            });
        }
        if self.rows.len() >= self.max_rows {
            return Err(CommandError::Reader(reader::ReaderError::LengthOverflow {
                requested: self.rows.len() as i64 + 1,
                max: self.max_rows,
            }));
        }

        let fields: Vec<String> = fields[..self.schema.field_count]
            .iter()
            .map(|f| f.trim().to_string())
            .collect();
        let numeric = reader::parse_i64(&fields[self.schema.numeric_field])?;

        self.numbers.push(numeric);
        self.rows.push(fields);
        Ok(None)
    }

    fn finish(&mut self) -> Result<Vec<String>, CommandError> {
        let mean = self.numbers.mean()?;
        let first = self.rows.first().map(|row| row.join(", ")).unwrap_or_default();
        Ok(vec![
            format!(
                "Loaded {} records. Average {}: {}",
                self.rows.len(),
                self.schema.label,
                mean
            ),
            format!("First record: {first}"),
        ])
    }
}
