use serde_json::Value;

/// Decides whether a decoded payload is an application-level error rather
/// than data. Returns the error message when it is.
pub trait ErrorDetector: Send + Sync {
    fn detect(&self, payload: &Value) -> Option<String>;
}

impl<F> ErrorDetector for F
where
    F: Fn(&Value) -> Option<String> + Send + Sync,
{
    fn detect(&self, payload: &Value) -> Option<String> {
        self(payload)
    }
}

/// dserve reports failures as `["message"]`: a top-level array whose first
/// element is a string, where data rows are always arrays.
#[derive(Clone, Copy, Debug, Default)]
pub struct DserveErrorDetector;

impl ErrorDetector for DserveErrorDetector {
    fn detect(&self, payload: &Value) -> Option<String> {
        match payload {
            Value::Array(items) => match items.first() {
                Some(Value::String(msg)) => Some(msg.clone()),
                _ => None,
            },
            Value::Object(map) => match map.get("error") {
                Some(Value::String(msg)) => Some(msg.clone()),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            },
            Value::String(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}
