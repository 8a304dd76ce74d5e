use std::collections::HashMap;

use serde_json::Value;
use tp_core::{Config, Message, TpError};
use tp_schema::{flatten_schema, primary_column_names, ProjectedSchema, Validator};
use tp_io::{BatchBuffer, Merger, TableManager};

/// Per-stream registered state: the projected column set, key columns, and
/// open batch buffer, except the raw declared schema, which we don't need
/// again after projecting it once.
struct StreamState {
    projected: ProjectedSchema,
    key_columns: Vec<String>,
    buffer: BatchBuffer,
}

/// Owns the stream registry and the pending checkpoint, and dispatches one
/// input line at a time. `handle` dispatches one line; `drain` finishes the
/// run, flushing every open batch and returning the pending checkpoint.
pub struct Driver<'a> {
    cfg: &'a Config,
    table_manager: TableManager,
    streams: HashMap<String, StreamState>,
    pending_state: Option<Value>,
}

impl<'a> Driver<'a> {
    pub fn new(cfg: &'a Config) -> Self {
        Driver {
            cfg,
            table_manager: TableManager::new(cfg.schema.clone()),
            streams: HashMap::new(),
            pending_state: None,
        }
    }

    /// Strips the literal backslash-u-0000 escape sequence and parses
    /// the result as one JSON message.
    pub fn sanitize_and_parse(line: &str) -> Result<Value, TpError> {
        let sanitized = line.replace("\\u0000", "");
        serde_json::from_str(&sanitized).map_err(|source| TpError::Parse {
            line: line.to_string(),
            source,
        })
    }

    /// Dispatches one already-parsed message.
    pub async fn handle(&mut self, value: Value) -> Result<(), TpError> {
        match Message::from_value(value)? {
            Message::Schema {
                stream,
                schema,
                key_properties,
            } => self.handle_schema(stream, schema, key_properties).await,
            Message::Record { stream, record } => self.handle_record(stream, record).await,
            Message::State { value } => {
                self.pending_state = Some(value);
                Ok(())
            }
            Message::ActivateVersion => {
                tracing::info!("ACTIVATE_VERSION received (no-op)");
                Ok(())
            }
        }
    }

    async fn handle_schema(
        &mut self,
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
    ) -> Result<(), TpError> {
        if self.streams.contains_key(&stream) {
            tracing::warn!(stream = %stream, "ignoring repeated SCHEMA for already-registered stream");
            return Ok(());
        }

        let projected = flatten_schema(&schema)?;
        let key_columns = primary_column_names(&key_properties);
        let validator = Validator::new(stream.clone(), &schema)?;

        self.table_manager.ensure_schema(self.cfg).await?;
        self.table_manager
            .ensure_table(self.cfg, &stream, &projected, &key_columns)
            .await?;

        let buffer = BatchBuffer::new(validator, &projected, key_columns.clone(), self.cfg.batch_size)?;
        self.streams.insert(
            stream,
            StreamState {
                projected,
                key_columns,
                buffer,
            },
        );
        Ok(())
    }

    async fn handle_record(&mut self, stream: String, record: Value) -> Result<(), TpError> {
        self.pending_state = None;

        let state = self.streams.get_mut(&stream).ok_or_else(|| {
            TpError::Protocol(format!("RECORD for unregistered stream '{stream}'"))
        })?;

        if let Some(completed) = state.buffer.append(&record)? {
            Merger::merge_batch(
                self.cfg,
                &self.cfg.schema,
                &stream,
                &state.projected,
                &state.key_columns,
                completed,
            )
            .await?;
        }
        Ok(())
    }

    /// Flushes every stream with a non-empty open batch, then returns the
    /// pending checkpoint (if any) to be written to stdout.
    pub async fn drain(mut self) -> Result<Option<Value>, TpError> {
        for (stream, state) in self.streams.iter_mut() {
            if let Some(completed) = state.buffer.finish()? {
                Merger::merge_batch(
                    self.cfg,
                    &self.cfg.schema,
                    stream,
                    &state.projected,
                    &state.key_columns,
                    completed,
                )
                .await?;
            }
        }
        Ok(self.pending_state.take())
    }
}
