use std::collections::HashSet;
use std::fs::File;
use std::io::Seek;

use serde_json::Value;
use tp_core::TpError;
use tp_schema::{flatten_record, FlattenedRecord, ProjectedSchema, Validator};

/// One flushed batch's backing file, rewound to byte 0 and ready for the
/// Merger's COPY step, plus its row count (for logging).
pub struct CompletedBatch {
    pub file: File,
    pub row_count: usize,
}

/// Per-stream spool: an append-only CSV file plus the in-memory primary-key
/// fingerprint set for the batch currently being accumulated.
pub struct BatchBuffer {
    validator: Validator,
    columns: Vec<String>,
    key_columns: Vec<String>,
    batch_size: usize,
    writer: csv::Writer<File>,
    file: File,
    count: usize,
    fingerprints: HashSet<String>,
}

impl BatchBuffer {
    pub fn new(
        validator: Validator,
        projected: &ProjectedSchema,
        key_columns: Vec<String>,
        batch_size: usize,
    ) -> Result<Self, TpError> {
        let file = tempfile::tempfile()?;
        let writer = Self::make_writer(&file)?;
        Ok(BatchBuffer {
            validator,
            columns: projected.keys().cloned().collect(),
            key_columns,
            batch_size,
            writer,
            file,
            count: 0,
            fingerprints: HashSet::new(),
        })
    }

    fn make_writer(file: &File) -> Result<csv::Writer<File>, TpError> {
        Ok(csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Necessary)
            .double_quote(false)
            .escape(b'\\')
            .from_writer(file.try_clone()?))
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Validates and appends `record`. Returns a completed batch when this
    /// append triggered a flush: either because `record`'s fingerprint
    /// already appeared in the open batch (flush happens *before* the
    /// duplicate is written, so it lands in the next batch), or because the
    /// append pushed the row count to `batch_size` (flush happens *after*).
    pub fn append(&mut self, record: &Value) -> Result<Option<CompletedBatch>, TpError> {
        self.validator.validate(record)?;

        if is_empty_record(record) {
            tracing::warn!("skipping empty record");
            return Ok(None);
        }

        let flat = flatten_record(record);
        let fingerprint = self.fingerprint(&flat);

        let mut completed = None;
        if let Some(fp) = &fingerprint {
            if self.fingerprints.contains(fp) {
                completed = Some(self.flush()?);
            }
        }

        self.write_row(&flat)?;
        self.count += 1;
        if let Some(fp) = fingerprint {
            self.fingerprints.insert(fp);
        }

        if completed.is_none() && self.count >= self.batch_size {
            completed = Some(self.flush()?);
        }

        Ok(completed)
    }

    /// Flushes the open batch unconditionally (used at end-of-input). Returns
    /// `None` if the buffer is empty.
    pub fn finish(&mut self) -> Result<Option<CompletedBatch>, TpError> {
        if self.count == 0 {
            return Ok(None);
        }
        Ok(Some(self.flush()?))
    }

    fn flush(&mut self) -> Result<CompletedBatch, TpError> {
        self.writer.flush()?;

        let row_count = self.count;
        let mut handed_off = self.file.try_clone()?;
        handed_off.seek(std::io::SeekFrom::Start(0))?;

        self.file = tempfile::tempfile()?;
        self.writer = Self::make_writer(&self.file)?;
        self.count = 0;
        self.fingerprints.clear();

        Ok(CompletedBatch {
            file: handed_off,
            row_count,
        })
    }

    fn write_row(&mut self, flat: &FlattenedRecord) -> Result<(), TpError> {
        let mut record = csv::ByteRecord::new();
        for col in &self.columns {
            let field = match flat.get(col) {
                Some(v) if is_truthy(v) => encode_field(v),
                _ => String::new(),
            };
            record.push_field(field.as_bytes());
        }
        self.writer.write_byte_record(&record)?;
        Ok(())
    }

    /// The comma-joined string of stringified primary-key values in declared
    /// order, or `None` if there are no key columns or any key value is
    /// missing from the flattened record.
    fn fingerprint(&self, flat: &FlattenedRecord) -> Option<String> {
        if self.key_columns.is_empty() {
            return None;
        }
        let mut parts = Vec::with_capacity(self.key_columns.len());
        for key in &self.key_columns {
            match flat.get(key) {
                Some(v) if !v.is_null() => parts.push(encode_field(v)),
                _ => return None,
            }
        }
        Some(parts.join(","))
    }
}

fn encode_field(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
    }
}

fn is_empty_record(record: &Value) -> bool {
    match record {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}
