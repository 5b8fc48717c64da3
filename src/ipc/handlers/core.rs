use crate::ipc::helpers::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(
        req,
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "inMemory": state.store.is_some() && state.workspace.is_none(),
        })),
    )
}

fn workspace_select(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    if req.params.get("inMemory").and_then(|v| v.as_bool()) == Some(true) {
        state.open_in_memory()?;
        tracing::info!("in-memory workspace selected");
        return Ok(json!({ "workspacePath": null, "inMemory": true }));
    }

    let Some(path) = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
    else {
        return Err(HandlerErr::bad_params("missing params.path"));
    };

    state.open_workspace(&path)?;
    tracing::info!(workspace = %path.display(), "workspace selected");
    Ok(json!({ "workspacePath": path.to_string_lossy(), "inMemory": false }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(respond(req, workspace_select(state, req))),
        _ => None,
    }
}
