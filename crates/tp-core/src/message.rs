use serde_json::Value;

/// One line of the input stream, already parsed and dispatched by `type`.
///
/// Deliberately not `#[serde(tag = "type")]`-derived: the wire format carries
/// extra fields the driver ignores (e.g. `ACTIVATE_VERSION`'s `version`), and
/// a missing `type` field needs to surface as a protocol error rather than a
/// deserialization failure. `Message::from_line` does the dispatch by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Schema {
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
    },
    Record {
        stream: String,
        record: Value,
    },
    State {
        value: Value,
    },
    ActivateVersion,
}

impl Message {
    /// Parse one already-sanitized JSON line into a recognized message.
    ///
    /// Every recognized `type` produces a variant; anything else, including
    /// a missing `type` field, is a protocol error.
    pub fn from_value(value: Value) -> Result<Message, crate::TpError> {
        let obj = value.as_object().ok_or_else(|| {
            crate::TpError::Protocol("message is not a JSON object".to_string())
        })?;
        let msg_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| crate::TpError::Protocol("message has no 'type' field".to_string()))?;

        match msg_type {
            "SCHEMA" => {
                let stream = required_str(obj, "stream")?;
                let schema = obj.get("schema").cloned().unwrap_or(Value::Null);
                let key_properties = obj
                    .get("key_properties")
                    .ok_or_else(|| {
                        crate::TpError::Protocol(
                            "SCHEMA message missing 'key_properties'".to_string(),
                        )
                    })?
                    .as_array()
                    .ok_or_else(|| {
                        crate::TpError::Protocol("'key_properties' is not an array".to_string())
                    })?
                    .iter()
                    .map(|v| {
                        v.as_str().map(str::to_string).ok_or_else(|| {
                            crate::TpError::Protocol(
                                "'key_properties' entry is not a string".to_string(),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Message::Schema {
                    stream,
                    schema,
                    key_properties,
                })
            }
            "RECORD" => {
                let stream = required_str(obj, "stream")?;
                let record = obj.get("record").cloned().unwrap_or(Value::Null);
                Ok(Message::Record { stream, record })
            }
            "STATE" => {
                let value = obj.get("value").cloned().unwrap_or(Value::Null);
                Ok(Message::State { value })
            }
            "ACTIVATE_VERSION" => Ok(Message::ActivateVersion),
            other => Err(crate::TpError::Protocol(format!(
                "unrecognized message type '{other}'"
            ))),
        }
    }
}

fn required_str(
    obj: &serde_json::Map<String, Value>,
    field: &str,
) -> Result<String, crate::TpError> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| crate::TpError::Protocol(format!("message missing '{field}'")))
}
