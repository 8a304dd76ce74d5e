/// The crate-wide error type. Every fatal condition surfaces as one of
/// these variants; `main` maps any `TpError` reaching the top to a
/// non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum TpError {
    #[error("failed to parse line as JSON: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("schema collision: column '{column}' is produced by more than one path")]
    SchemaCollision { column: String },

    #[error("stream '{stream}' declared no key_properties where one was required")]
    MissingKeyProperties { stream: String },

    #[error("record for stream '{stream}' failed schema validation: {message}")]
    Validation { stream: String, message: String },

    #[error(transparent)]
    Database(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
