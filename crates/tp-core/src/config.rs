use serde::Deserialize;

fn default_schema() -> String {
    "public".to_string()
}

fn default_batch_size() -> usize {
    100_000
}

/// Runtime configuration, deserialized from the JSON file named by `-c/--config`.
///
/// Every field is optional at the JSON level except the two with defaults
/// (`schema`, `batch_size`); an absent `-c` flag yields `Config::default()`,
/// which is a valid (if unauthenticated) configuration: `tokio_postgres`
/// will simply fail to connect, surfacing as a `TpError::Database`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: Option<String>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: None,
            dbname: None,
            user: None,
            password: None,
            port: None,
            schema: default_schema(),
            batch_size: default_batch_size(),
        }
    }
}

impl Config {
    /// Build the libpq-style connection string `tokio_postgres::connect` expects.
    pub fn connection_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(host) = &self.host {
            parts.push(format!("host={host}"));
        }
        if let Some(port) = self.port {
            parts.push(format!("port={port}"));
        }
        if let Some(dbname) = &self.dbname {
            parts.push(format!("dbname={dbname}"));
        }
        if let Some(user) = &self.user {
            parts.push(format!("user={user}"));
        }
        if let Some(password) = &self.password {
            parts.push(format!("password={password}"));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_public_schema_and_default_batch_size() {
        let cfg = Config::default();
        assert_eq!(cfg.schema, "public");
        assert_eq!(cfg.batch_size, 100_000);
    }

    #[test]
    fn deserializes_partial_json() {
        let cfg: Config = serde_json::from_str(r#"{"host": "db.internal", "dbname": "warehouse"}"#)
            .unwrap();
        assert_eq!(cfg.host.as_deref(), Some("db.internal"));
        assert_eq!(cfg.schema, "public");
        assert_eq!(cfg.batch_size, 100_000);
    }

    #[test]
    fn connection_string_omits_unset_fields() {
        let cfg = Config {
            host: Some("localhost".into()),
            port: Some(5432),
            ..Config::default()
        };
        assert_eq!(cfg.connection_string(), "host=localhost port=5432");
    }
}
