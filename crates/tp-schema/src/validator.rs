use serde_json::Value;
use tp_core::TpError;

/// Wraps a compiled JSON Schema (Draft-4 semantics, matching the original
/// Python target's `Draft4Validator`) for one stream.
pub struct Validator {
    stream: String,
    compiled: jsonschema::Validator,
}

impl Validator {
    pub fn new(stream: impl Into<String>, schema: &Value) -> Result<Self, TpError> {
        let stream = stream.into();
        let compiled = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft4)
            .build(schema)
            .map_err(|e| TpError::Validation {
                stream: stream.clone(),
                message: e.to_string(),
            })?;
        Ok(Validator { stream, compiled })
    }

    /// Validates a record, surfacing the first violation as a `TpError`.
    /// There is no skip-and-continue: a failure here is always fatal.
    pub fn validate(&self, record: &Value) -> Result<(), TpError> {
        if let Err(err) = self.compiled.validate(record) {
            return Err(TpError::Validation {
                stream: self.stream.clone(),
                message: err.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_conforming_record() {
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "string"}},
            "required": ["id"]
        });
        let v = Validator::new("widgets", &schema).unwrap();
        assert!(v.validate(&json!({"id": "1"})).is_ok());
    }

    #[test]
    fn rejects_nonconforming_record() {
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "string"}},
            "required": ["id"]
        });
        let v = Validator::new("widgets", &schema).unwrap();
        assert!(v.validate(&json!({})).is_err());
    }
}
