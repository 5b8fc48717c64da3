use crate::ipc::helpers::{class_param, name_param, require_store, respond, str_param, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::CapabilityLevel;
use crate::roster::StudentPatch;
use serde_json::{json, Value};

fn level_param(raw: Option<&Value>) -> Result<Option<CapabilityLevel>, HandlerErr> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .and_then(CapabilityLevel::parse)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params("capabilityLevel must be high, medium or low")),
    }
}

fn students_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = class_param(req, state.roster.current_class_id())?;
    let class = state.roster.class(&class_id)?;
    Ok(json!({ "classId": class.id, "students": class.students }))
}

fn students_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let class_id = class_param(req, state.roster.current_class_id())?;
    let name = name_param(req, "name")?;
    let level = level_param(req.params.get("capabilityLevel"))?.unwrap_or_default();
    let present = req
        .params
        .get("present")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    let student = state
        .roster
        .add_student(store, &class_id, &name, level, present)?;
    Ok(json!({ "studentId": student.id, "student": student }))
}

fn students_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let class_id = class_param(req, state.roster.current_class_id())?;
    let student_id = str_param(req, "studentId")?;
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("missing patch"));
    };

    let name = match patch.get("name") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let n = v
                .as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| HandlerErr::bad_params("patch.name must be a string"))?;
            if n.is_empty() {
                return Err(HandlerErr::bad_params("patch.name must not be empty"));
            }
            Some(n)
        }
    };
    let present = match patch.get("present") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_bool()
                .ok_or_else(|| HandlerErr::bad_params("patch.present must be a boolean"))?,
        ),
    };
    let patch = StudentPatch {
        name,
        capability_level: level_param(patch.get("capabilityLevel"))?,
        present,
    };

    let student = state
        .roster
        .update_student(store, &class_id, student_id, patch)?;
    Ok(json!({ "student": student }))
}

fn students_toggle_present(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let class_id = class_param(req, state.roster.current_class_id())?;
    let student_id = str_param(req, "studentId")?;
    let present = state.roster.toggle_present(store, &class_id, student_id)?;
    Ok(json!({ "studentId": student_id, "present": present }))
}

fn students_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let class_id = class_param(req, state.roster.current_class_id())?;
    let student_id = str_param(req, "studentId")?;
    state.roster.remove_student(store, &class_id, student_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state, req),
        "students.create" => students_create(state, req),
        "students.update" => students_update(state, req),
        "students.togglePresent" => students_toggle_present(state, req),
        "students.delete" => students_delete(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
