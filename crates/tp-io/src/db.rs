use futures_util::{pin_mut, SinkExt};
use tokio::io::AsyncReadExt;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use tp_core::{Config, TpError};

/// A thin wrapper over one `tokio_postgres` connection. Callers open one of
/// these per operation, or, for the merge protocol, share one across the
/// CREATE/COPY/UPDATE/INSERT/DROP sequence so the TEMP table survives.
pub struct DbAdapter {
    client: Client,
    // keeps the background connection-driver future alive; dropping this
    // adapter aborts the task and closes the connection.
    _connection: tokio::task::JoinHandle<()>,
}

impl DbAdapter {
    pub async fn connect(cfg: &Config) -> Result<Self, TpError> {
        let (client, connection) =
            tokio_postgres::connect(&cfg.connection_string(), NoTls).await?;
        let handle = tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(%err, "postgres connection driver error");
            }
        });
        Ok(DbAdapter {
            client,
            _connection: handle,
        })
    }

    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, TpError> {
        Ok(self.client.query(sql, params).await?)
    }

    pub async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, TpError> {
        Ok(self.client.execute(sql, params).await?)
    }

    /// Streams `reader` into `table`'s COPY path, `FORMAT CSV, ESCAPE '\\'`,
    /// with an explicit column list (never `COPY {table} FROM STDIN` bare).
    pub async fn copy_into(
        &self,
        table: &str,
        columns: &[String],
        mut reader: impl tokio::io::AsyncRead + Unpin,
    ) -> Result<(), TpError> {
        let cols = columns.join(", ");
        let sql = format!("COPY {table} ({cols}) FROM STDIN WITH (FORMAT CSV, ESCAPE '\\')");
        let sink = self.client.copy_in(&sql).await?;
        pin_mut!(sink);

        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            sink.send(bytes::Bytes::copy_from_slice(&buf[..n])).await?;
        }
        sink.close().await?;
        Ok(())
    }
}
