use std::fmt;

/// One of the six SQL types the projector ever emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Jsonb,
    TimestampTz,
    Numeric,
    BigInt,
    Boolean,
    Varchar,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SqlType::Jsonb => "jsonb",
            SqlType::TimestampTz => "timestamp with time zone",
            SqlType::Numeric => "numeric",
            SqlType::BigInt => "bigint",
            SqlType::Boolean => "boolean",
            SqlType::Varchar => "character varying",
        };
        f.write_str(s)
    }
}

impl SqlType {
    /// Best-effort reverse mapping from an `information_schema.columns.data_type`
    /// string back to a `SqlType`, used by `evolve_columns` diffing. Anything
    /// unrecognized maps to `Varchar` since that's the default projection target.
    pub fn from_information_schema(data_type: &str) -> SqlType {
        match data_type {
            "jsonb" => SqlType::Jsonb,
            "timestamp with time zone" => SqlType::TimestampTz,
            "numeric" => SqlType::Numeric,
            "bigint" => SqlType::BigInt,
            "boolean" => SqlType::Boolean,
            _ => SqlType::Varchar,
        }
    }
}

/// A projected column: its final (inflected) name and resolved SQL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Column {
            name: name.into(),
            sql_type,
        }
    }
}
