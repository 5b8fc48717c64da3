//! An open grouping: freshly generated (`Generated`) or reopened from
//! history (`Saved`). Closing persists it; a reopened grouping overwrites
//! its own history entry instead of creating a new one.

use crate::error::RosterResult;
use crate::grouping;
use crate::history::HistoryRecorder;
use crate::model::{new_id, Group, GroupingHistoryEntry, GroupingMethod, Student};
use crate::store::KeyValueStore;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Generated,
    Saved,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingSession {
    class_id: String,
    grouping_id: String,
    method: GroupingMethod,
    value: usize,
    groups: Vec<Group>,
    state: SessionState,
}

/// Emitted whenever a grouping lands in history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingSaved {
    pub class_id: String,
    pub grouping_id: String,
    pub created: bool,
}

impl GroupingSession {
    pub fn generate(
        class_id: &str,
        eligible: &[Student],
        method: GroupingMethod,
        value: i64,
    ) -> RosterResult<Self> {
        Self::generate_with_rng(class_id, eligible, method, value, &mut rand::rng())
    }

    pub fn generate_with_rng<R>(
        class_id: &str,
        eligible: &[Student],
        method: GroupingMethod,
        value: i64,
        rng: &mut R,
    ) -> RosterResult<Self>
    where
        R: Rng + ?Sized,
    {
        let groups = grouping::generate_groups_with_rng(eligible, method, value, rng)?;
        Ok(GroupingSession {
            class_id: class_id.to_string(),
            grouping_id: new_id(),
            method,
            value: value as usize,
            groups,
            state: SessionState::Generated,
        })
    }

    pub fn open(class_id: &str, entry: GroupingHistoryEntry) -> Self {
        GroupingSession {
            class_id: class_id.to_string(),
            grouping_id: entry.id,
            method: entry.method,
            value: entry.value,
            groups: entry.groups,
            state: SessionState::Saved,
        }
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn grouping_id(&self) -> &str {
        &self.grouping_id
    }

    pub fn move_student(&mut self, student_id: &str, to_group: usize) -> RosterResult<bool> {
        grouping::move_student(&mut self.groups, student_id, to_group)
    }

    pub fn rename_group(&mut self, index: usize, name: &str) -> RosterResult<()> {
        grouping::rename_group(&mut self.groups, index, name)
    }

    /// History snapshot as of now: fresh timestamp, positional group ids,
    /// student count taken from current membership.
    pub fn to_entry(&self) -> GroupingHistoryEntry {
        let mut groups = self.groups.clone();
        grouping::reindex(&mut groups);
        GroupingHistoryEntry {
            id: self.grouping_id.clone(),
            timestamp: Utc::now(),
            method: self.method,
            value: self.value,
            number_of_students: groups.iter().map(|g| g.students.len()).sum(),
            groups,
        }
    }

    /// Writes the grouping to history. A `Saved` grouping whose entry has
    /// since been deleted fails with `ReferenceNotFound` and writes nothing.
    pub fn save(&mut self, store: &dyn KeyValueStore) -> RosterResult<GroupingSaved> {
        let history = HistoryRecorder::new(store);
        let entry = self.to_entry();
        let created = match self.state {
            SessionState::Generated => history.save(&self.class_id, entry)?,
            SessionState::Saved => {
                history.replace_existing(&self.class_id, entry)?;
                false
            }
        };
        self.state = SessionState::Saved;
        grouping::reindex(&mut self.groups);
        tracing::info!(
            class_id = %self.class_id,
            grouping_id = %self.grouping_id,
            created,
            "grouping saved"
        );
        Ok(GroupingSaved {
            class_id: self.class_id.clone(),
            grouping_id: self.grouping_id.clone(),
            created,
        })
    }
}
