use crate::ipc::helpers::{name_param, require_store, respond, str_param, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn classes_list(state: &mut AppState) -> Result<Value, HandlerErr> {
    // No workspace yet: an empty dashboard rather than an error.
    let classes: Vec<Value> = state
        .roster
        .classes()
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "studentCount": c.students.len(),
                "presentCount": c.students.iter().filter(|s| s.present).count(),
            })
        })
        .collect();
    Ok(json!({
        "classes": classes,
        "currentClassId": state.roster.current_class_id(),
    }))
}

fn classes_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let name = name_param(req, "name")?;
    let class = state.roster.create_class(store, &name)?;
    Ok(json!({ "classId": class.id, "name": class.name }))
}

fn classes_rename(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let class_id = str_param(req, "classId")?;
    let name = name_param(req, "name")?;
    state.roster.rename_class(store, class_id, &name)?;
    Ok(json!({ "classId": class_id, "name": name }))
}

fn classes_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let class_id = str_param(req, "classId")?;
    state.roster.delete_class(store, class_id)?;
    state.discard_session_for(class_id);
    state.history_revisions.remove(class_id);
    Ok(json!({ "currentClassId": state.roster.current_class_id() }))
}

fn classes_select(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = str_param(req, "classId")?;
    state.roster.select_class(class_id)?;
    Ok(json!({ "currentClassId": class_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "classes.list" => classes_list(state),
        "classes.create" => classes_create(state, req),
        "classes.rename" => classes_rename(state, req),
        "classes.delete" => classes_delete(state, req),
        "classes.select" => classes_select(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
