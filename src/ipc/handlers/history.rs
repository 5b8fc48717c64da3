use crate::error::RosterError;
use crate::history::HistoryRecorder;
use crate::ipc::helpers::{class_param, require_store, respond, str_param, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::session::GroupingSession;
use serde_json::{json, Value};

fn history_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let class_id = class_param(req, state.roster.current_class_id())?;
    state.roster.class(&class_id)?;
    let entries = HistoryRecorder::new(store).load(&class_id)?;
    Ok(json!({
        "classId": class_id,
        "entries": entries,
        "revision": state.history_revision(&class_id),
    }))
}

fn history_open(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let class_id = class_param(req, state.roster.current_class_id())?;
    let grouping_id = str_param(req, "groupingId")?;
    let Some(entry) = HistoryRecorder::new(store).get(&class_id, grouping_id)? else {
        return Err(RosterError::not_found("grouping", grouping_id).into());
    };

    // Reopening the grouping that is already open keeps its unsaved edits.
    if state
        .session
        .as_ref()
        .is_some_and(|s| s.grouping_id() == grouping_id)
    {
        return Ok(json!({ "session": state.session }));
    }

    state.close_session()?;
    let session = GroupingSession::open(&class_id, entry);
    state.session = Some(session);
    Ok(json!({ "session": state.session }))
}

fn history_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = require_store(&state.store)?;
    let class_id = class_param(req, state.roster.current_class_id())?;
    let grouping_id = str_param(req, "groupingId")?;
    let removed = HistoryRecorder::new(store).delete(&class_id, grouping_id)?;

    // An unsaved grouping has no entry yet; it stays open and saves on close.
    if removed
        && state
            .session
            .as_ref()
            .is_some_and(|s| s.grouping_id() == grouping_id)
    {
        state.session = None;
    }
    let revision = if removed {
        state.bump_history(&class_id)
    } else {
        state.history_revision(&class_id)
    };
    Ok(json!({ "removed": removed, "revision": revision }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "history.list" => history_list(state, req),
        "history.open" => history_open(state, req),
        "history.delete" => history_delete(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
