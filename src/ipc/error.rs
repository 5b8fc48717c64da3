use serde_json::json;

use crate::error::RosterError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn roster_err(id: &str, e: &RosterError) -> serde_json::Value {
    let details = match e {
        RosterError::ReferenceNotFound { kind, id: missing } => {
            tracing::warn!(kind, id = %missing, "reference not found; operation abandoned");
            Some(json!({ "kind": kind, "id": missing }))
        }
        RosterError::Store(inner) => {
            tracing::error!("store failure: {inner:#}");
            None
        }
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
