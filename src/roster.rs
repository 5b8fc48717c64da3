use crate::error::{RosterError, RosterResult};
use crate::history::HistoryRecorder;
use crate::model::{history_key, CapabilityLevel, Class, Student, ROSTER_KEY};
use crate::store::KeyValueStore;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub capability_level: Option<CapabilityLevel>,
    pub present: Option<bool>,
}

/// In-memory roster mirrored to the store after every successful change.
/// Mutations are staged on a copy and only applied once the write succeeds.
#[derive(Debug, Default)]
pub struct RosterStore {
    classes: Vec<Class>,
    current_class_id: Option<String>,
}

impl RosterStore {
    pub fn load(store: &dyn KeyValueStore) -> RosterResult<Self> {
        let classes = match store.get(ROSTER_KEY)? {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<Class>>(&raw) {
                Ok(classes) => dedupe_classes(classes),
                Err(e) => {
                    let malformed = RosterError::MalformedPersistedData {
                        key: ROSTER_KEY.to_string(),
                        message: e.to_string(),
                    };
                    tracing::warn!("{malformed}; starting with an empty roster");
                    Vec::new()
                }
            },
        };
        let current_class_id = classes.first().map(|c| c.id.clone());
        Ok(RosterStore {
            classes,
            current_class_id,
        })
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn class(&self, class_id: &str) -> RosterResult<&Class> {
        self.classes
            .iter()
            .find(|c| c.id == class_id)
            .ok_or_else(|| RosterError::not_found("class", class_id))
    }

    pub fn current_class_id(&self) -> Option<&str> {
        self.current_class_id.as_deref()
    }

    pub fn select_class(&mut self, class_id: &str) -> RosterResult<()> {
        self.class(class_id)?;
        self.current_class_id = Some(class_id.to_string());
        Ok(())
    }

    /// Students eligible for grouping (present ones) in roster order.
    pub fn eligible_students(&self, class_id: &str) -> RosterResult<Vec<Student>> {
        Ok(self.class(class_id)?.eligible_students())
    }

    /// Creates a class and makes it the current one.
    pub fn create_class(&mut self, store: &dyn KeyValueStore, name: &str) -> RosterResult<Class> {
        let name = clean_name(name, "class name")?;
        let class = Class::new(name);
        let mut next = self.classes.clone();
        next.push(class.clone());
        self.commit(store, next)?;
        self.current_class_id = Some(class.id.clone());
        tracing::info!(class_id = %class.id, "class created");
        Ok(class)
    }

    pub fn rename_class(
        &mut self,
        store: &dyn KeyValueStore,
        class_id: &str,
        name: &str,
    ) -> RosterResult<()> {
        let name = clean_name(name, "class name")?;
        self.mutate_class(store, class_id, |c| {
            c.name = name;
            Ok(())
        })
    }

    /// Deletes a class, its students and its whole grouping history.
    /// The history key goes first; if the roster write then fails, the
    /// history is put back and nothing has changed.
    pub fn delete_class(&mut self, store: &dyn KeyValueStore, class_id: &str) -> RosterResult<()> {
        self.class(class_id)?;
        let next: Vec<Class> = self
            .classes
            .iter()
            .filter(|c| c.id != class_id)
            .cloned()
            .collect();

        let key = history_key(class_id);
        let saved_history = store.get(&key)?;
        HistoryRecorder::new(store).clear(class_id)?;
        if let Err(e) = self.commit(store, next) {
            if let Some(raw) = saved_history {
                if let Err(restore) = store.set(&key, &raw) {
                    tracing::error!(class_id, "failed to restore grouping history: {restore:#}");
                }
            }
            return Err(e);
        }

        if self.current_class_id.as_deref() == Some(class_id) {
            self.current_class_id = self.classes.first().map(|c| c.id.clone());
        }
        tracing::info!(class_id, "class deleted with its grouping history");
        Ok(())
    }

    pub fn add_student(
        &mut self,
        store: &dyn KeyValueStore,
        class_id: &str,
        name: &str,
        capability_level: CapabilityLevel,
        present: bool,
    ) -> RosterResult<Student> {
        let name = clean_name(name, "student name")?;
        let mut student = Student::new(name, capability_level);
        student.present = present;
        let added = student.clone();
        self.mutate_class(store, class_id, move |c| {
            c.students.push(student);
            Ok(())
        })?;
        Ok(added)
    }

    pub fn update_student(
        &mut self,
        store: &dyn KeyValueStore,
        class_id: &str,
        student_id: &str,
        patch: StudentPatch,
    ) -> RosterResult<Student> {
        let name = match patch.name.as_deref() {
            Some(n) => Some(clean_name(n, "student name")?),
            None => None,
        };
        let mut updated = None;
        self.mutate_class(store, class_id, |c| {
            let student = c
                .student_mut(student_id)
                .ok_or_else(|| RosterError::not_found("student", student_id))?;
            if let Some(name) = name {
                student.name = name;
            }
            if let Some(level) = patch.capability_level {
                student.capability_level = level;
            }
            if let Some(present) = patch.present {
                student.present = present;
            }
            updated = Some(student.clone());
            Ok(())
        })?;
        updated.ok_or_else(|| RosterError::not_found("student", student_id))
    }

    /// Flips presence and returns the new value.
    pub fn toggle_present(
        &mut self,
        store: &dyn KeyValueStore,
        class_id: &str,
        student_id: &str,
    ) -> RosterResult<bool> {
        let current = self
            .class(class_id)?
            .student(student_id)
            .ok_or_else(|| RosterError::not_found("student", student_id))?
            .present;
        let patch = StudentPatch {
            present: Some(!current),
            ..StudentPatch::default()
        };
        Ok(self.update_student(store, class_id, student_id, patch)?.present)
    }

    pub fn remove_student(
        &mut self,
        store: &dyn KeyValueStore,
        class_id: &str,
        student_id: &str,
    ) -> RosterResult<()> {
        self.mutate_class(store, class_id, |c| {
            let before = c.students.len();
            c.students.retain(|s| s.id != student_id);
            if c.students.len() == before {
                return Err(RosterError::not_found("student", student_id));
            }
            Ok(())
        })
    }

    fn mutate_class<F>(&mut self, store: &dyn KeyValueStore, class_id: &str, f: F) -> RosterResult<()>
    where
        F: FnOnce(&mut Class) -> RosterResult<()>,
    {
        let mut next = self.classes.clone();
        let class = next
            .iter_mut()
            .find(|c| c.id == class_id)
            .ok_or_else(|| RosterError::not_found("class", class_id))?;
        f(class)?;
        self.commit(store, next)
    }

    fn commit(&mut self, store: &dyn KeyValueStore, next: Vec<Class>) -> RosterResult<()> {
        let json = serde_json::to_string(&next)
            .map_err(|e| RosterError::Store(anyhow::Error::new(e)))?;
        store.set(ROSTER_KEY, &json)?;
        self.classes = next;
        Ok(())
    }
}

fn clean_name(raw: &str, what: &str) -> RosterResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(RosterError::InvalidParameter(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(name.to_string())
}

fn dedupe_classes(classes: Vec<Class>) -> Vec<Class> {
    let mut seen = HashSet::new();
    classes
        .into_iter()
        .filter(|c| {
            let fresh = seen.insert(c.id.clone());
            if !fresh {
                tracing::warn!(class_id = %c.id, "dropping class with duplicate id");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Group, GroupingHistoryEntry, GroupingMethod};
    use crate::store::MemoryStore;
    use std::cell::Cell;

    fn one_group_entry(id: &str, students: Vec<Student>) -> GroupingHistoryEntry {
        GroupingHistoryEntry {
            id: id.to_string(),
            timestamp: chrono::Utc::now(),
            method: GroupingMethod::ByGroupCount,
            value: 1,
            number_of_students: students.len(),
            groups: vec![Group {
                id: 0,
                name: Group::default_name(0),
                students,
            }],
        }
    }

    fn roster_with_class(store: &MemoryStore) -> (RosterStore, String) {
        let mut roster = RosterStore::load(store).expect("load");
        let class = roster.create_class(store, " Period 3 ").expect("create");
        (roster, class.id)
    }

    #[test]
    fn changes_persist_and_reload() {
        let store = MemoryStore::new();
        let (mut roster, class_id) = roster_with_class(&store);
        let ada = roster
            .add_student(&store, &class_id, "Ada", CapabilityLevel::High, true)
            .expect("add");
        roster
            .add_student(&store, &class_id, "Linus", CapabilityLevel::Low, true)
            .expect("add");
        assert!(!roster.toggle_present(&store, &class_id, &ada.id).expect("toggle"));
        roster.rename_class(&store, &class_id, "Period 4").expect("rename");

        let reloaded = RosterStore::load(&store).expect("reload");
        let class = reloaded.class(&class_id).expect("class");
        assert_eq!(class.name, "Period 4");
        let names: Vec<&str> = class.students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Linus"]);
        assert_eq!(reloaded.current_class_id(), Some(class_id.as_str()));

        let eligible = reloaded.eligible_students(&class_id).expect("eligible");
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].name, "Linus");
    }

    #[test]
    fn update_student_applies_patch() {
        let store = MemoryStore::new();
        let (mut roster, class_id) = roster_with_class(&store);
        let s = roster
            .add_student(&store, &class_id, "Ada", CapabilityLevel::Medium, true)
            .expect("add");
        let updated = roster
            .update_student(
                &store,
                &class_id,
                &s.id,
                StudentPatch {
                    name: Some("Ada L.".into()),
                    capability_level: Some(CapabilityLevel::High),
                    present: None,
                },
            )
            .expect("update");
        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.capability_level, CapabilityLevel::High);
        assert!(updated.present);
    }

    #[test]
    fn failed_operations_leave_state_unchanged() {
        let store = MemoryStore::new();
        let (mut roster, class_id) = roster_with_class(&store);
        let before = store.get(ROSTER_KEY).expect("get");

        assert!(matches!(
            roster.remove_student(&store, &class_id, "ghost"),
            Err(RosterError::ReferenceNotFound { .. })
        ));
        assert!(matches!(
            roster.add_student(&store, "ghost", "Ada", CapabilityLevel::Low, true),
            Err(RosterError::ReferenceNotFound { .. })
        ));
        assert!(matches!(
            roster.add_student(&store, &class_id, "   ", CapabilityLevel::Low, true),
            Err(RosterError::InvalidParameter(_))
        ));
        assert!(roster.class(&class_id).expect("class").students.is_empty());
        assert_eq!(store.get(ROSTER_KEY).expect("get"), before);
    }

    #[test]
    fn delete_class_cascades_history_and_moves_selection() {
        let store = MemoryStore::new();
        let (mut roster, first_id) = roster_with_class(&store);
        let second = roster.create_class(&store, "Period 5").expect("create");
        assert_eq!(roster.current_class_id(), Some(second.id.as_str()));

        let s = roster
            .add_student(&store, &second.id, "Ada", CapabilityLevel::High, true)
            .expect("add");
        let history = HistoryRecorder::new(&store);
        history
            .save(&second.id, one_group_entry("g1", vec![s.clone()]))
            .expect("save history");
        history
            .save(&first_id, one_group_entry("g2", vec![s]))
            .expect("save other class history");

        roster.delete_class(&store, &second.id).expect("delete");
        assert_eq!(store.get(&history_key(&second.id)).expect("get"), None);
        assert_eq!(history.load(&first_id).expect("load").len(), 1);
        assert_eq!(roster.current_class_id(), Some(first_id.as_str()));
        assert!(roster.class(&second.id).is_err());

        roster.delete_class(&store, &first_id).expect("delete last");
        assert_eq!(roster.current_class_id(), None);
    }

    #[test]
    fn malformed_roster_loads_empty() {
        let store = MemoryStore::new();
        store.set(ROSTER_KEY, "[{\"id\":").expect("set");
        let roster = RosterStore::load(&store).expect("load");
        assert!(roster.classes().is_empty());
        assert_eq!(roster.current_class_id(), None);
    }

    #[test]
    fn duplicate_class_ids_keep_the_first() {
        let store = MemoryStore::new();
        store
            .set(
                ROSTER_KEY,
                r#"[{"id": 1, "name": "A", "students": []}, {"id": "1", "name": "B"}]"#,
            )
            .expect("set");
        let roster = RosterStore::load(&store).expect("load");
        assert_eq!(roster.classes().len(), 1);
        assert_eq!(roster.classes()[0].name, "A");
    }

    /// Memory store whose removes, or roster writes, can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_remove: Cell<bool>,
        fail_roster_write: Cell<bool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if key == ROSTER_KEY && self.fail_roster_write.get() {
                anyhow::bail!("disk full");
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            if self.fail_remove.get() {
                anyhow::bail!("read-only store");
            }
            self.inner.remove(key)
        }

        fn keys(&self) -> anyhow::Result<Vec<String>> {
            self.inner.keys()
        }
    }

    fn flaky_class_with_history() -> (FlakyStore, RosterStore, String) {
        let store = FlakyStore::default();
        let mut roster = RosterStore::load(&store).expect("load");
        let class = roster.create_class(&store, "Period 9").expect("create");
        let s = roster
            .add_student(&store, &class.id, "Ada", CapabilityLevel::High, true)
            .expect("add");
        HistoryRecorder::new(&store)
            .save(&class.id, one_group_entry("g1", vec![s]))
            .expect("save history");
        (store, roster, class.id)
    }

    #[test]
    fn delete_class_with_failing_history_removal_changes_nothing() {
        let (store, mut roster, class_id) = flaky_class_with_history();
        let persisted = store.get(ROSTER_KEY).expect("get");
        store.fail_remove.set(true);

        let res = roster.delete_class(&store, &class_id);
        assert!(matches!(res, Err(RosterError::Store(_))));
        assert!(roster.class(&class_id).is_ok());
        assert_eq!(roster.current_class_id(), Some(class_id.as_str()));
        assert_eq!(store.get(ROSTER_KEY).expect("get"), persisted);
        assert_eq!(
            HistoryRecorder::new(&store).load(&class_id).expect("load").len(),
            1
        );
    }

    #[test]
    fn delete_class_with_failing_roster_write_restores_history() {
        let (store, mut roster, class_id) = flaky_class_with_history();
        let persisted = store.get(ROSTER_KEY).expect("get");
        store.fail_roster_write.set(true);

        let res = roster.delete_class(&store, &class_id);
        assert!(matches!(res, Err(RosterError::Store(_))));
        assert!(roster.class(&class_id).is_ok());
        assert_eq!(roster.current_class_id(), Some(class_id.as_str()));
        assert_eq!(store.get(ROSTER_KEY).expect("get"), persisted);
        assert_eq!(
            HistoryRecorder::new(&store).load(&class_id).expect("load").len(),
            1
        );
    }
}
