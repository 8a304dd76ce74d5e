use serde_json::Value;
use tp_core::SqlType;

/// One rung of the `most_general_type` lattice. Lower numbers are more
/// specific; resolution always widens towards the larger value.
fn generality(name: &str) -> u8 {
    match name {
        "boolean" => 1,
        "integer" => 2,
        "number" => 3,
        "string" => 4,
        _ => 4, // unknown names collapse to "string"
    }
}

/// Reduces a JSON-Schema `type` name set (already stripped of `null`) to a
/// single "most general" name: `string` dominates everything, `number` >
/// `integer` > `boolean`, and unrecognized names collapse to `string`.
pub fn most_general_type<'a>(names: impl IntoIterator<Item = &'a str>) -> &'static str {
    let mut best: Option<(&str, u8)> = None;
    for name in names {
        let g = generality(name);
        let normalized = if g == 4 { "string" } else { name };
        best = match best {
            None => Some((normalized, g)),
            Some((_, bg)) if g > bg => Some((normalized, g)),
            Some(existing) => Some(existing),
        };
    }
    match best {
        Some(("boolean", _)) => "boolean",
        Some(("integer", _)) => "integer",
        Some(("number", _)) => "number",
        _ => "string",
    }
}

fn type_names(prop: &Value) -> Vec<String> {
    match prop.get("type") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Resolves a declared JSON-Schema property to one of the six SQL types.
///
/// Applied in order, after dropping `null` from the declared type set:
/// 1. `object` or `array` present -> `jsonb`.
/// 2. Otherwise reduce the remaining names via [`most_general_type`].
/// 3. Map the reduced name (and `format`, for `string`) to a SQL type.
pub fn column_type(prop: &Value) -> SqlType {
    let names: Vec<String> = type_names(prop)
        .into_iter()
        .filter(|n| n != "null")
        .collect();

    if names.iter().any(|n| n == "object" || n == "array") {
        return SqlType::Jsonb;
    }

    if names.is_empty() {
        return SqlType::Varchar;
    }

    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    match most_general_type(refs) {
        "number" => SqlType::Numeric,
        "integer" => SqlType::BigInt,
        "boolean" => SqlType::Boolean,
        // "string" (and anything that collapsed into it)
        _ => {
            let format = prop.get("format").and_then(Value::as_str);
            if format == Some("date-time") {
                SqlType::TimestampTz
            } else {
                SqlType::Varchar
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_or_array_is_jsonb() {
        assert_eq!(
            column_type(&json!({"type": ["object"], "format": "date-time"})),
            SqlType::Jsonb
        );
        assert_eq!(column_type(&json!({"type": "array"})), SqlType::Jsonb);
    }

    #[test]
    fn string_with_date_time_format_is_timestamptz() {
        assert_eq!(
            column_type(&json!({"type": ["string"], "format": "date-time"})),
            SqlType::TimestampTz
        );
    }

    #[test]
    fn mixed_string_and_integer_collapses_to_string() {
        assert_eq!(
            column_type(&json!({"type": ["integer", "string"]})),
            SqlType::Varchar
        );
    }

    #[test]
    fn mixed_boolean_and_integer_widens_to_integer() {
        assert_eq!(
            column_type(&json!({"type": ["boolean", "integer"]})),
            SqlType::BigInt
        );
    }

    #[test]
    fn unknown_type_name_is_varchar() {
        assert_eq!(column_type(&json!({"type": "frobnicate"})), SqlType::Varchar);
    }

    #[test]
    fn plain_number_and_integer_and_boolean() {
        assert_eq!(column_type(&json!({"type": "number"})), SqlType::Numeric);
        assert_eq!(column_type(&json!({"type": "integer"})), SqlType::BigInt);
        assert_eq!(column_type(&json!({"type": "boolean"})), SqlType::Boolean);
    }

    #[test]
    fn null_is_filtered_before_resolution() {
        assert_eq!(
            column_type(&json!({"type": ["null", "integer"]})),
            SqlType::BigInt
        );
    }

    #[test]
    fn missing_type_defaults_to_varchar() {
        assert_eq!(column_type(&json!({})), SqlType::Varchar);
    }
}
