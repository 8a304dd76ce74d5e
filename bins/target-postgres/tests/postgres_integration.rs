//! End-to-end tests against a real PostgreSQL instance via `testcontainers`.
//! Exercises schema evolution, batch-merge idempotence, and the driver loop
//! against a canned stdin fixture.

use serde_json::json;
use testcontainers_modules::{postgres::Postgres, testcontainers::runners::AsyncRunner};
use tp_core::Config;
use tp_io::{BatchBuffer, Merger, TableManager};
use tp_schema::{flatten_schema, primary_column_names, Validator};

async fn test_config(port: u16) -> Config {
    Config {
        host: Some("127.0.0.1".to_string()),
        port: Some(port),
        user: Some("postgres".to_string()),
        password: Some("postgres".to_string()),
        dbname: Some("postgres".to_string()),
        schema: "test_schema".to_string(),
        batch_size: 1000,
    }
}

async fn column_names(cfg: &Config, table: &str) -> Vec<String> {
    let db = tp_io::DbAdapter::connect(cfg).await.unwrap();
    let rows = db
        .query(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 ORDER BY column_name",
            &[&cfg.schema, &table],
        )
        .await
        .unwrap();
    rows.iter().map(|r| r.get::<_, String>(0)).collect()
}

#[tokio::test]
async fn schema_evolution_adds_exactly_one_column() {
    let container = Postgres::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let cfg = test_config(port).await;

    let mgr = TableManager::new(cfg.schema.clone());
    mgr.ensure_schema(&cfg).await.unwrap();

    let v1 = json!({"type": "object", "properties": {"x": {"type": "string"}}});
    let projected_v1 = flatten_schema(&v1).unwrap();
    mgr.ensure_table(&cfg, "widgets", &projected_v1, &[])
        .await
        .unwrap();

    let before = column_names(&cfg, "widgets").await;
    assert_eq!(before, vec!["x".to_string()]);

    let v2 = json!({
        "type": "object",
        "properties": {"x": {"type": "string"}, "y": {"type": "string"}}
    });
    let projected_v2 = flatten_schema(&v2).unwrap();
    mgr.ensure_table(&cfg, "widgets", &projected_v2, &[])
        .await
        .unwrap();

    let after = column_names(&cfg, "widgets").await;
    assert_eq!(after, vec!["x".to_string(), "y".to_string()]);
}

#[tokio::test]
async fn batch_merge_last_wins_on_duplicate_primary_key() {
    let container = Postgres::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let cfg = test_config(port).await;

    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"}
        }
    });
    let projected = flatten_schema(&schema).unwrap();
    let key_columns = primary_column_names(&["id".to_string()]);

    let mgr = TableManager::new(cfg.schema.clone());
    mgr.ensure_schema(&cfg).await.unwrap();
    mgr.ensure_table(&cfg, "widgets", &projected, &key_columns)
        .await
        .unwrap();

    let validator = Validator::new("widgets", &schema).unwrap();
    let mut buffer = BatchBuffer::new(validator, &projected, key_columns.clone(), 1000).unwrap();

    // A, B, then a second A: the duplicate forces an early flush of [A, B],
    // and the second A lands in (and flushes as) the next batch.
    let first_flush = buffer
        .append(&json!({"id": 1, "name": "first"}))
        .unwrap();
    assert!(first_flush.is_none());
    let second_flush = buffer
        .append(&json!({"id": 2, "name": "second"}))
        .unwrap();
    assert!(second_flush.is_none());
    let dup_flush = buffer
        .append(&json!({"id": 1, "name": "first-updated"}))
        .unwrap();
    assert!(dup_flush.is_some());

    Merger::merge_batch(
        &cfg,
        &cfg.schema,
        "widgets",
        &projected,
        &key_columns,
        dup_flush.unwrap(),
    )
    .await
    .unwrap();

    let tail = buffer.finish().unwrap().unwrap();
    Merger::merge_batch(&cfg, &cfg.schema, "widgets", &projected, &key_columns, tail)
        .await
        .unwrap();

    let db = tp_io::DbAdapter::connect(&cfg).await.unwrap();
    let rows = db
        .query(
            "SELECT id, name FROM test_schema.widgets ORDER BY id",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let names: Vec<String> = rows.iter().map(|r| r.get::<_, String>(1)).collect();
    assert_eq!(names, vec!["first-updated".to_string(), "second".to_string()]);
}

#[tokio::test]
async fn no_key_properties_merge_is_pure_append() {
    let container = Postgres::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let cfg = test_config(port).await;

    let schema = json!({"type": "object", "properties": {"event": {"type": "string"}}});
    let projected = flatten_schema(&schema).unwrap();

    let mgr = TableManager::new(cfg.schema.clone());
    mgr.ensure_schema(&cfg).await.unwrap();
    mgr.ensure_table(&cfg, "events", &projected, &[]).await.unwrap();

    let validator = Validator::new("events", &schema).unwrap();
    let mut buffer = BatchBuffer::new(validator, &projected, vec![], 1000).unwrap();
    buffer.append(&json!({"event": "a"})).unwrap();
    buffer.append(&json!({"event": "a"})).unwrap();
    let batch = buffer.finish().unwrap().unwrap();
    assert_eq!(batch.row_count, 2);

    Merger::merge_batch(&cfg, &cfg.schema, "events", &projected, &[], batch)
        .await
        .unwrap();

    let db = tp_io::DbAdapter::connect(&cfg).await.unwrap();
    let rows = db
        .query("SELECT event FROM test_schema.events", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}
