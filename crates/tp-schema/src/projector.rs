use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tp_core::TpError;

use crate::inflect::{flatten_path, inflect_identifier};

/// The projected column set for one stream: inflected column name -> the
/// declared JSON-Schema fragment for that leaf. Iteration order is always
/// the sorted column-name order, matching the order every CSV row and every
/// generated DDL statement uses.
pub type ProjectedSchema = IndexMap<String, Value>;

/// Flattened data for one record: inflected column name (where it maps to a
/// projected column) -> value, plus any intermediate dict-valued entries.
/// Lookups against a `ProjectedSchema` simply ignore keys the schema never
/// declared.
pub type FlattenedRecord = IndexMap<String, Value>;

fn node_declares_object(node: &Value) -> bool {
    match node.get("type") {
        Some(Value::String(s)) => s == "object",
        Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some("object")),
        _ => false,
    }
}

fn walk_schema(
    node: &Value,
    path: &mut Vec<String>,
    out: &mut BTreeMap<String, Value>,
) -> Result<(), TpError> {
    if node_declares_object(node) {
        if let Some(props) = node.get("properties").and_then(Value::as_object) {
            for (key, sub) in props {
                path.push(key.clone());
                walk_schema(sub, path, out)?;
                path.pop();
            }
            return Ok(());
        }
    }

    let refs: Vec<&str> = path.iter().map(String::as_str).collect();
    let column = flatten_path(&refs);
    if out.contains_key(&column) {
        return Err(TpError::SchemaCollision { column });
    }
    out.insert(column, node.clone());
    Ok(())
}

/// Recursively flattens a declared JSON Schema into its projected column
/// set. `object` subtrees with a `properties` map are walked; everything
/// else (including `array`, which is encoded as `jsonb`) is a leaf. Two
/// distinct paths producing the same inflected column name is a fatal
/// `SchemaCollision`.
pub fn flatten_schema(schema: &Value) -> Result<ProjectedSchema, TpError> {
    let mut out = BTreeMap::new();
    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        let mut path = Vec::new();
        for (key, sub) in props {
            path.push(key.clone());
            walk_schema(sub, &mut path, &mut out)?;
            path.pop();
        }
    }
    Ok(out.into_iter().collect())
}

fn walk_record(obj: &Map<String, Value>, path: &mut Vec<String>, out: &mut BTreeMap<String, Value>) {
    for (key, val) in obj {
        path.push(key.clone());
        let refs: Vec<&str> = path.iter().map(String::as_str).collect();
        let column = flatten_path(&refs);
        match val {
            Value::Object(sub) => {
                // the intermediate dict value is emitted too, not just its leaves
                out.insert(column, val.clone());
                walk_record(sub, path, out);
            }
            _ => {
                out.insert(column, val.clone());
            }
        }
        path.pop();
    }
}

/// Flattens a data record the same way `flatten_schema` flattens its schema.
/// Non-mapping inputs (`null`, a bare string, an empty array, ...) yield an
/// empty map. Array/tuple-valued fields are leaves (their `Value` is stored
/// as-is; the buffer JSON-encodes it when writing the CSV row).
pub fn flatten_record(record: &Value) -> FlattenedRecord {
    let mut out = BTreeMap::new();
    if let Some(obj) = record.as_object() {
        let mut path = Vec::new();
        walk_record(obj, &mut path, &mut out);
    }
    out.into_iter().collect()
}

/// Inflects each declared `key_properties` entry into its column-name form.
pub fn primary_column_names(key_properties: &[String]) -> Vec<String> {
    key_properties.iter().map(|k| inflect_identifier(k)).collect()
}

/// `{schema}.{stream}` for the permanent target, or `{stream}_temp` for the
/// session-local staging table. The stream name is inflected the same way a
/// column segment would be.
pub fn table_name(stream: &str, schema_name: &str, is_temporary: bool) -> String {
    let inflected = inflect_identifier(stream);
    if is_temporary {
        format!("{inflected}_temp")
    } else {
        format!("{schema_name}.{inflected}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_of(props: Value) -> Value {
        json!({"type": "object", "properties": props})
    }

    #[test]
    fn flatten_schema_is_sorted_and_recurses_objects_only() {
        let schema = schema_of(json!({
            "id": {"type": "string"},
            "address": {
                "type": "object",
                "properties": {
                    "city": {"type": "string"},
                    "zip": {"type": "string"}
                }
            },
            "tags": {"type": "array"}
        }));
        let projected = flatten_schema(&schema).unwrap();
        let keys: Vec<&str> = projected.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["address__city", "address__zip", "id", "tags"]);
    }

    #[test]
    fn flatten_schema_detects_collision() {
        // top-level "x__y" and nested x.y both inflect to column "x__y"
        let schema = schema_of(json!({
            "x__y": {"type": "string"},
            "x": {
                "type": "object",
                "properties": { "y": {"type": "string"} }
            }
        }));
        match flatten_schema(&schema) {
            Err(TpError::SchemaCollision { column }) => assert_eq!(column, "x__y"),
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn flatten_record_boundary_cases() {
        assert!(flatten_record(&Value::Null).is_empty());
        assert!(flatten_record(&json!([])).is_empty());
        assert!(flatten_record(&json!("x")).is_empty());
    }

    #[test]
    fn flatten_record_emits_intermediate_and_leaf_entries() {
        let record = json!({"custom_fields": {"app": {"value": "nested"}}});
        let flat = flatten_record(&record);
        assert_eq!(flat.get("custom_fields"), Some(&json!({"app": {"value": "nested"}})));
        assert_eq!(flat.get("custom_fields__app"), Some(&json!({"value": "nested"})));
        assert_eq!(flat.get("custom_fields__app__value"), Some(&json!("nested")));
    }

    #[test]
    fn flatten_record_array_field_is_a_leaf() {
        let record = json!({"tags": ["a", "b"]});
        let flat = flatten_record(&record);
        assert_eq!(flat.get("tags"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn primary_column_names_inflects_each_entry() {
        let names = primary_column_names(&["Test Primary".into(), "Test_secondary".into()]);
        assert_eq!(names, vec!["test__primary", "test_secondary"]);
    }

    #[test]
    fn table_name_cases() {
        assert_eq!(table_name("TestTable", "test_schema", true), "test_table_temp");
        assert_eq!(table_name("Test_table", "test_schema", false), "test_schema.test_table");
        assert_eq!(table_name("test Table", "test_schema", false), "test_schema.test__table");
    }
}
