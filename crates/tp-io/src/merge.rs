use tp_core::{Config, TpError};
use tp_schema::{column_type, table_name, ProjectedSchema};

use crate::buffer::CompletedBatch;
use crate::db::DbAdapter;
use crate::ident::quote_ident;

/// Executes the staging-table merge protocol for one flushed batch:
/// `CREATE TEMP TABLE` -> `COPY` -> `UPDATE` -> `INSERT` -> `DROP TABLE`, all
/// on one connection. There is no rollback across batches: a failure here
/// aborts this batch and propagates; already-committed batches stand.
pub struct Merger;

impl Merger {
    pub async fn merge_batch(
        cfg: &Config,
        schema_name: &str,
        stream: &str,
        projected: &ProjectedSchema,
        key_columns: &[String],
        batch: CompletedBatch,
    ) -> Result<(), TpError> {
        let db = DbAdapter::connect(cfg).await?;
        let permanent = table_name(stream, schema_name, false);
        let (schema_part, table_part) = permanent
            .split_once('.')
            .expect("table_name always schema-qualifies the permanent form");
        let qualified = format!("{}.{}", quote_ident(schema_part), quote_ident(table_part));
        let quoted_temp = quote_ident(&table_name(stream, schema_name, true));
        let columns: Vec<&String> = projected.keys().collect();

        let cols_ddl = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(c), column_type(&projected[c.as_str()])))
            .collect::<Vec<_>>()
            .join(", ");
        db.execute(
            &format!("CREATE TEMP TABLE {quoted_temp} ({cols_ddl})"),
            &[],
        )
        .await?;

        let copy_columns: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let async_file = tokio::fs::File::from_std(batch.file);
        db.copy_into(&quoted_temp, &copy_columns, async_file).await?;
        tracing::info!(
            stream,
            rows = batch.row_count,
            "copied batch into staging table"
        );

        if key_columns.is_empty() {
            let col_list = columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            db.execute(
                &format!("INSERT INTO {qualified} ({col_list}) SELECT {col_list} FROM {quoted_temp}"),
                &[],
            )
            .await?;
        } else {
            let join_clause = key_columns
                .iter()
                .map(|k| format!("s.{0} = t.{0}", quote_ident(k)))
                .collect::<Vec<_>>()
                .join(" AND ");

            let non_key_columns: Vec<&&String> =
                columns.iter().filter(|c| !key_columns.contains(c)).collect();
            if !non_key_columns.is_empty() {
                let set_clause = non_key_columns
                    .iter()
                    .map(|c| format!("{0} = s.{0}", quote_ident(c)))
                    .collect::<Vec<_>>()
                    .join(", ");
                db.execute(
                    &format!(
                        "UPDATE {qualified} AS t SET {set_clause} FROM {quoted_temp} AS s WHERE {join_clause}"
                    ),
                    &[],
                )
                .await?;
            }

            let col_list = columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            let select_list = columns
                .iter()
                .map(|c| format!("s.{}", quote_ident(c)))
                .collect::<Vec<_>>()
                .join(", ");
            let null_check = format!("t.{} IS NULL", quote_ident(key_columns[0].as_str()));
            db.execute(
                &format!(
                    "INSERT INTO {qualified} ({col_list}) \
                     SELECT {select_list} FROM {quoted_temp} AS s \
                     LEFT OUTER JOIN {qualified} AS t ON {join_clause} \
                     WHERE {null_check}"
                ),
                &[],
            )
            .await?;
        }

        db.execute(&format!("DROP TABLE {quoted_temp}"), &[]).await?;
        Ok(())
    }
}
