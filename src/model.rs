use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const ROSTER_KEY: &str = "classes";

pub fn history_key(class_id: &str) -> String {
    format!("groupHistory-{}", class_id)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityLevel {
    High,
    #[default]
    Medium,
    Low,
}

impl CapabilityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityLevel::High => "high",
            CapabilityLevel::Medium => "medium",
            CapabilityLevel::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(CapabilityLevel::High),
            "medium" => Some(CapabilityLevel::Medium),
            "low" => Some(CapabilityLevel::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default = "default_present", deserialize_with = "de_present")]
    pub present: bool,
    #[serde(default, deserialize_with = "de_level")]
    pub capability_level: CapabilityLevel,
}

impl Student {
    pub fn new(name: impl Into<String>, capability_level: CapabilityLevel) -> Self {
        Student {
            id: new_id(),
            name: name.into(),
            present: true,
            capability_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub students: Vec<Student>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Class {
            id: new_id(),
            name: name.into(),
            students: Vec::new(),
        }
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    pub fn student_mut(&mut self, student_id: &str) -> Option<&mut Student> {
        self.students.iter_mut().find(|s| s.id == student_id)
    }

    /// Students with `present = true`, in roster order.
    pub fn eligible_students(&self) -> Vec<Student> {
        self.students.iter().filter(|s| s.present).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupingMethod {
    #[serde(rename = "byGroupCount", alias = "byGroups")]
    ByGroupCount,
    #[serde(rename = "byGroupSize", alias = "byStudents")]
    ByGroupSize,
}

impl GroupingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupingMethod::ByGroupCount => "byGroupCount",
            GroupingMethod::ByGroupSize => "byGroupSize",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "byGroupCount" | "byGroups" => Some(GroupingMethod::ByGroupCount),
            "byGroupSize" | "byStudents" => Some(GroupingMethod::ByGroupSize),
            _ => None,
        }
    }
}

/// One named group inside a history entry. `id` is the group's position at
/// save time and is reassigned on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: usize,
    pub name: String,
    #[serde(default)]
    pub students: Vec<Student>,
}

impl Group {
    pub fn default_name(index: usize) -> String {
        format!("Group {}", index + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingHistoryEntry {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub method: GroupingMethod,
    pub value: usize,
    pub number_of_students: usize,
    #[serde(default)]
    pub groups: Vec<Group>,
}

fn default_present() -> bool {
    true
}

// Older stored rosters used numeric timestamps as identifiers.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

fn de_present<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

fn de_level<'de, D>(deserializer: D) -> Result<CapabilityLevel, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(CapabilityLevel::parse)
        .unwrap_or_default())
}
