use serde_json::Value;

use crate::error::RosterError;
use crate::ipc::error::{err, ok, roster_err};
use crate::ipc::types::Request;
use crate::store::KeyValueStore;

pub enum HandlerErr {
    Wire {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },
    Roster(RosterError),
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr::Wire {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr::Wire {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> Value {
        match self {
            HandlerErr::Wire {
                code,
                message,
                details,
            } => err(id, code, message, details),
            HandlerErr::Roster(e) => roster_err(id, &e),
        }
    }
}

impl From<RosterError> for HandlerErr {
    fn from(e: RosterError) -> Self {
        HandlerErr::Roster(e)
    }
}

pub fn respond(req: &Request, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn require_store(store: &Option<Box<dyn KeyValueStore>>) -> Result<&dyn KeyValueStore, HandlerErr> {
    store
        .as_deref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn str_param<'a>(req: &'a Request, name: &str) -> Result<&'a str, HandlerErr> {
    req.params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", name)))
}

/// Trimmed, non-empty string parameter.
pub fn name_param(req: &Request, name: &str) -> Result<String, HandlerErr> {
    let v = str_param(req, name)?.trim().to_string();
    if v.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", name)));
    }
    Ok(v)
}

pub fn index_param(req: &Request, name: &str) -> Result<usize, HandlerErr> {
    req.params
        .get(name)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing or invalid {}", name)))
}

/// Class id from params, falling back to the current selection.
pub fn class_param(req: &Request, current: Option<&str>) -> Result<String, HandlerErr> {
    match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => Ok(v.to_string()),
        None => current
            .map(|s| s.to_string())
            .ok_or_else(|| HandlerErr::bad_params("missing classId")),
    }
}
