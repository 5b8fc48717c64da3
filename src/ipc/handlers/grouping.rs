use crate::error::RosterError;
use crate::grouping::parse_sizing_value;
use crate::ipc::helpers::{class_param, index_param, name_param, require_store, respond, str_param, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::GroupingMethod;
use crate::session::{GroupingSaved, GroupingSession};
use serde_json::{json, Value};

fn session_view(state: &AppState) -> Value {
    match state.session.as_ref() {
        Some(s) => json!({ "session": s }),
        None => json!({ "session": null }),
    }
}

fn saved_view(state: &AppState, saved: Option<GroupingSaved>) -> Value {
    match saved {
        Some(ev) => json!({
            "type": "grouping.saved",
            "classId": ev.class_id,
            "groupingId": ev.grouping_id,
            "created": ev.created,
            "historyRevision": state.history_revision(&ev.class_id),
        }),
        None => Value::Null,
    }
}

fn open_session_mut(state: &mut AppState) -> Result<&mut GroupingSession, HandlerErr> {
    state
        .session
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_session", "no grouping is open"))
}

fn grouping_generate(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    require_store(&state.store)?;
    let class_id = class_param(req, state.roster.current_class_id())?;
    let method = str_param(req, "method")?;
    let Some(method) = GroupingMethod::parse(method) else {
        return Err(HandlerErr::bad_params(
            "method must be byGroupCount or byGroupSize",
        ));
    };
    let value = parse_sizing_value(req.params.get("value"))?;

    let eligible = state.roster.eligible_students(&class_id)?;
    if eligible.is_empty() {
        return Err(RosterError::NoEligibleStudents.into());
    }
    // Validate before touching any open grouping.
    let session = GroupingSession::generate(&class_id, &eligible, method, value)?;

    let previous = state.close_session()?;
    let previous = saved_view(state, previous);
    state.session = Some(session);

    let mut out = session_view(state);
    out["closedPrevious"] = previous;
    Ok(out)
}

fn grouping_current(state: &mut AppState) -> Result<Value, HandlerErr> {
    Ok(session_view(state))
}

fn grouping_move_student(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let student_id = str_param(req, "studentId")?;
    let to_group = index_param(req, "toGroup")?;
    let moved = open_session_mut(state)?.move_student(student_id, to_group)?;
    let mut out = session_view(state);
    out["moved"] = json!(moved);
    Ok(out)
}

fn grouping_rename_group(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let index = index_param(req, "groupIndex")?;
    let name = name_param(req, "name")?;
    open_session_mut(state)?.rename_group(index, &name)?;
    Ok(session_view(state))
}

fn grouping_close(state: &mut AppState) -> Result<Value, HandlerErr> {
    let saved = state.close_session()?;
    Ok(json!({ "saved": saved_view(state, saved) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "grouping.generate" => grouping_generate(state, req),
        "grouping.current" => grouping_current(state),
        "grouping.moveStudent" => grouping_move_student(state, req),
        "grouping.renameGroup" => grouping_rename_group(state, req),
        "grouping.close" => grouping_close(state),
        _ => return None,
    };
    Some(respond(req, result))
}
