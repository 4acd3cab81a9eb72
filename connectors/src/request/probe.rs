use serde_json::Value;

/// Inspects a decoded body for a venue-level error report.
pub type Probe = fn(&Value) -> Option<String>;

/// Recognises the error shapes used by the supported venues:
/// `{"error": ..}`, `{"code": n, "msg": ..}`, `{"message": ..}`,
/// `{"status": "error", "err-msg": ..}` and `{"code": n, "description": ..}`.
pub fn venue_error(body: &Value) -> Option<String> {
    let object = body.as_object()?;

    if let Some(error) = object.get("error") {
        match error {
            Value::Null | Value::Bool(false) => {}
            Value::String(message) if message.is_empty() => {}
            Value::String(message) => return Some(message.clone()),
            other => return Some(other.to_string()),
        }
    }

    if object.get("status").and_then(Value::as_str) == Some("error") {
        let message = object
            .get("err-msg")
            .and_then(Value::as_str)
            .unwrap_or("unspecified error");
        return Some(message.to_string());
    }

    let code = object.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        for field in ["msg", "description", "message"] {
            if let Some(message) = object.get(field).and_then(Value::as_str) {
                return Some(format!("{} (code {})", message, code));
            }
        }
    }

    if object.len() == 1 {
        if let Some(message) = object.get("message").and_then(Value::as_str) {
            return Some(message.to_string());
        }
    }

    None
}
