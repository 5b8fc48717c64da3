use crate::backup;
use crate::error::RosterError;
use crate::export;
use crate::ipc::helpers::{require_store, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

fn path_param(req: &Request, name: &str) -> Option<String> {
    req.params
        .get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn export_csv(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let csv = export::roster_csv(state.roster.classes(), store)?;

    let Some(out_path) = path_param(req, "outPath") else {
        return Ok(json!({ "csv": csv }));
    };
    let out = PathBuf::from(&out_path);
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| HandlerErr::new("export_failed", e.to_string()))?;
    }
    std::fs::write(&out, csv.as_bytes())
        .map_err(|e| HandlerErr::new("export_failed", e.to_string()))?;
    tracing::info!(path = %out_path, "roster csv written");
    Ok(json!({ "csv": csv, "outPath": out_path }))
}

fn backup_export_bundle(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let Some(out_path) = path_param(req, "outPath") else {
        return Err(HandlerErr::bad_params("missing outPath"));
    };

    let mut entries = BTreeMap::new();
    for key in store.keys().map_err(RosterError::from)? {
        if let Some(value) = store.get(&key).map_err(RosterError::from)? {
            entries.insert(key, value);
        }
    }

    let export = backup::export_store_bundle(&entries, &PathBuf::from(&out_path))
        .map_err(|e| HandlerErr::new("export_failed", format!("{e:#}")))?;
    tracing::info!(path = %out_path, entries = export.entry_count, "bundle exported");
    Ok(json!({
        "path": out_path,
        "bundleFormat": export.bundle_format,
        "entryCount": export.entry_count,
        "sha256": export.sha256,
    }))
}

fn backup_import_bundle(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let Some(in_path) = path_param(req, "inPath") else {
        return Err(HandlerErr::bad_params("missing inPath"));
    };
    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return Err(HandlerErr::new("not_found", "bundle file not found"));
    }
    let import = backup::import_store_bundle(&src)
        .map_err(|e| HandlerErr::new("import_failed", format!("{e:#}")))?;

    let store = require_store(&state.store)?;
    for key in store.keys().map_err(RosterError::from)? {
        if !import.entries.contains_key(&key) {
            store.remove(&key).map_err(RosterError::from)?;
        }
    }
    for (key, value) in &import.entries {
        store.set(key, value).map_err(RosterError::from)?;
    }
    state.reload_roster()?;

    tracing::info!(path = %in_path, keys = import.entries.len(), "bundle imported");
    Ok(json!({
        "bundleFormatDetected": import.bundle_format_detected,
        "keyCount": import.entries.len(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "export.csv" => export_csv(state, req),
        "backup.exportBundle" => backup_export_bundle(state, req),
        "backup.importBundle" => backup_import_bundle(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
