use std::collections::HashSet;

use tp_core::{Config, TpError};
use tp_schema::{column_type, table_name, ProjectedSchema};

use crate::db::DbAdapter;
use crate::ident::quote_ident;

/// Creates schemas and tables, and evolves existing tables' column sets.
/// Every method opens its own short-lived connection, none of these need
/// the TEMP-table connection affinity the Merger requires.
pub struct TableManager {
    schema_name: String,
}

impl TableManager {
    pub fn new(schema_name: impl Into<String>) -> Self {
        TableManager {
            schema_name: schema_name.into(),
        }
    }

    pub async fn ensure_schema(&self, cfg: &Config) -> Result<(), TpError> {
        let db = DbAdapter::connect(cfg).await?;
        let rows = db
            .query(
                "SELECT schema_name FROM information_schema.schemata WHERE schema_name = $1",
                &[&self.schema_name],
            )
            .await?;
        if rows.is_empty() {
            db.execute(
                &format!(
                    "CREATE SCHEMA IF NOT EXISTS {}",
                    quote_ident(&self.schema_name)
                ),
                &[],
            )
            .await?;
        }
        Ok(())
    }

    /// Creates the target table if absent (with a `PRIMARY KEY` clause when
    /// the stream declares key properties), otherwise evolves its columns.
    pub async fn ensure_table(
        &self,
        cfg: &Config,
        stream: &str,
        projected: &ProjectedSchema,
        key_columns: &[String],
    ) -> Result<(), TpError> {
        let db = DbAdapter::connect(cfg).await?;
        let qualified = table_name(stream, &self.schema_name, false);
        let (_, table) = qualified
            .split_once('.')
            .expect("table_name always schema-qualifies the permanent form");
        let rows = db
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = $1 AND lower(table_name) = lower($2)",
                &[&self.schema_name, &table],
            )
            .await?;

        if rows.is_empty() {
            let ddl = self.create_table_ddl(table, projected, key_columns);
            db.execute(&ddl, &[]).await?;
        } else {
            self.evolve_columns(&db, table, projected).await?;
        }
        Ok(())
    }

    fn create_table_ddl(
        &self,
        table: &str,
        projected: &ProjectedSchema,
        key_columns: &[String],
    ) -> String {
        let mut cols: Vec<String> = projected
            .iter()
            .map(|(name, prop)| format!("{} {}", quote_ident(name), column_type(prop)))
            .collect();
        if !key_columns.is_empty() {
            let pk = key_columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            cols.push(format!("PRIMARY KEY ({pk})"));
        }
        format!(
            "CREATE TABLE {}.{} (\n  {}\n)",
            quote_ident(&self.schema_name),
            quote_ident(table),
            cols.join(",\n  ")
        )
    }

    /// Diffs the live column set against the projected one (case-insensitive
    /// on name) and adds whatever is missing. Existing columns are never
    /// altered, even if the projected type has since changed.
    async fn evolve_columns(
        &self,
        db: &DbAdapter,
        table: &str,
        projected: &ProjectedSchema,
    ) -> Result<(), TpError> {
        let rows = db
            .query(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = $1 AND lower(table_name) = lower($2)",
                &[&self.schema_name, &table],
            )
            .await?;
        let existing: HashSet<String> = rows
            .iter()
            .map(|r| r.get::<_, String>(0).to_lowercase())
            .collect();

        for (name, prop) in projected {
            if !existing.contains(&name.to_lowercase()) {
                let ddl = format!(
                    "ALTER TABLE {}.{} ADD COLUMN {} {}",
                    quote_ident(&self.schema_name),
                    quote_ident(table),
                    quote_ident(name),
                    column_type(prop)
                );
                db.execute(&ddl, &[]).await?;
            }
        }
        Ok(())
    }
}
