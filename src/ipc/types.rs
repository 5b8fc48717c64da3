use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::db;
use crate::error::{RosterError, RosterResult};
use crate::roster::RosterStore;
use crate::session::{GroupingSaved, GroupingSession};
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Box<dyn KeyValueStore>>,
    pub roster: RosterStore,
    /// At most one grouping is open at a time.
    pub session: Option<GroupingSession>,
    /// Bumped on every history change of a class; lets the UI refresh.
    pub history_revisions: HashMap<String, u64>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            workspace: None,
            store: None,
            roster: RosterStore::default(),
            session: None,
            history_revisions: HashMap::new(),
        }
    }

    pub fn open_workspace(&mut self, path: &Path) -> RosterResult<()> {
        let conn = db::open_db(path)?;
        self.attach_store(Some(path.to_path_buf()), Box::new(SqliteStore::new(conn)))
    }

    pub fn open_in_memory(&mut self) -> RosterResult<()> {
        self.attach_store(None, Box::new(MemoryStore::new()))
    }

    fn attach_store(
        &mut self,
        workspace: Option<PathBuf>,
        store: Box<dyn KeyValueStore>,
    ) -> RosterResult<()> {
        let roster = RosterStore::load(store.as_ref())?;
        self.close_session()?;
        self.workspace = workspace;
        self.store = Some(store);
        self.roster = roster;
        self.history_revisions.clear();
        Ok(())
    }

    /// Re-reads the roster after the store was rewritten underneath it.
    pub fn reload_roster(&mut self) -> RosterResult<()> {
        let Some(store) = self.store.as_deref() else {
            return Ok(());
        };
        self.roster = RosterStore::load(store)?;
        self.session = None;
        self.history_revisions.clear();
        Ok(())
    }

    /// Saves and closes the open grouping, if any. A reopened grouping whose
    /// history entry vanished is dropped; other failures keep it open.
    pub fn close_session(&mut self) -> RosterResult<Option<GroupingSaved>> {
        let Some(mut session) = self.session.take() else {
            return Ok(None);
        };
        let Some(store) = self.store.as_deref() else {
            tracing::warn!(grouping_id = %session.grouping_id(), "no store for open grouping; dropped");
            return Ok(None);
        };
        match session.save(store) {
            Ok(saved) => {
                self.bump_history(&saved.class_id);
                Ok(Some(saved))
            }
            Err(e @ RosterError::ReferenceNotFound { .. }) => Err(e),
            Err(e) => {
                self.session = Some(session);
                Err(e)
            }
        }
    }

    /// Drops an open grouping belonging to `class_id` without saving it.
    pub fn discard_session_for(&mut self, class_id: &str) {
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.class_id() == class_id)
        {
            self.session = None;
        }
    }

    pub fn bump_history(&mut self, class_id: &str) -> u64 {
        let rev = self.history_revisions.entry(class_id.to_string()).or_insert(0);
        *rev += 1;
        *rev
    }

    pub fn history_revision(&self, class_id: &str) -> u64 {
        self.history_revisions.get(class_id).copied().unwrap_or(0)
    }
}
