//! Balanced random group generation.
//!
//! Eligible students are bucketed by capability level, each bucket is
//! shuffled (Fisher-Yates via `rand`), the buckets are interleaved one
//! student per level per round, and the combined order is dealt to groups
//! by `position % group_count`. Group sizes therefore differ by at most one.

use crate::error::{RosterError, RosterResult};
use crate::model::{CapabilityLevel, Group, GroupingMethod, Student};
use rand::seq::SliceRandom;
use rand::Rng;

const LEVEL_ORDER: [CapabilityLevel; 3] = [
    CapabilityLevel::High,
    CapabilityLevel::Medium,
    CapabilityLevel::Low,
];

pub fn generate_groups_with_rng<R>(
    students: &[Student],
    method: GroupingMethod,
    value: i64,
    rng: &mut R,
) -> RosterResult<Vec<Group>>
where
    R: Rng + ?Sized,
{
    let group_count = group_count(method, value, students.len())?;

    let mut buckets: Vec<Vec<Student>> = LEVEL_ORDER
        .iter()
        .map(|level| {
            students
                .iter()
                .filter(|s| s.capability_level == *level)
                .cloned()
                .collect()
        })
        .collect();
    for bucket in buckets.iter_mut() {
        bucket.shuffle(rng);
    }

    let combined = interleave(buckets, group_count);

    let mut groups: Vec<Group> = (0..group_count)
        .map(|i| Group {
            id: i,
            name: Group::default_name(i),
            students: Vec::new(),
        })
        .collect();
    for (i, student) in combined.into_iter().enumerate() {
        groups[i % group_count].students.push(student);
    }

    tracing::debug!(
        students = students.len(),
        groups = group_count,
        method = method.as_str(),
        "generated groups"
    );
    Ok(groups)
}

/// Number of groups for `method`/`value` over `eligible` students.
pub fn group_count(method: GroupingMethod, value: i64, eligible: usize) -> RosterResult<usize> {
    if eligible == 0 {
        return Err(RosterError::NoEligibleStudents);
    }
    if value < 1 {
        return Err(RosterError::InvalidParameter(format!(
            "{} must be at least 1",
            value_label(method)
        )));
    }
    let value = value as usize;
    if value > eligible {
        return Err(RosterError::InvalidParameter(format!(
            "{} cannot exceed the number of students ({})",
            value_label(method),
            eligible
        )));
    }

    Ok(match method {
        GroupingMethod::ByGroupCount => value,
        GroupingMethod::ByGroupSize => eligible.div_ceil(value),
    })
}

fn value_label(method: GroupingMethod) -> &'static str {
    match method {
        GroupingMethod::ByGroupCount => "number of groups",
        GroupingMethod::ByGroupSize => "students per group",
    }
}

/// One student from each non-empty bucket per round, skipping exhausted
/// buckets. When the group count is a multiple of the number of levels in
/// play, a fixed bucket order would deal every level to the same groups, so
/// each round then starts one bucket later.
fn interleave(buckets: Vec<Vec<Student>>, group_count: usize) -> Vec<Student> {
    let levels_in_play = buckets.iter().filter(|b| !b.is_empty()).count();
    let rotate = levels_in_play > 1 && group_count % levels_in_play == 0;
    let rounds = buckets.iter().map(|b| b.len()).max().unwrap_or(0);
    let total: usize = buckets.iter().map(|b| b.len()).sum();

    let mut iters: Vec<_> = buckets.into_iter().map(|b| b.into_iter()).collect();
    let mut out = Vec::with_capacity(total);
    for round in 0..rounds {
        let start = if rotate { round % iters.len() } else { 0 };
        for k in 0..iters.len() {
            let idx = (start + k) % iters.len();
            if let Some(s) = iters[idx].next() {
                out.push(s);
            }
        }
    }
    out
}

/// Parses a sizing parameter from the wire. Numbers and numeric strings
/// follow one rule: whole values (`3`, `3.0`, `"3"`, `"3.0"`) are accepted.
/// Range checks happen in [`group_count`].
pub fn parse_sizing_value(raw: Option<&serde_json::Value>) -> RosterResult<i64> {
    let invalid = || RosterError::InvalidParameter("value must be a whole number".into());
    let Some(raw) = raw else {
        return Err(RosterError::InvalidParameter("missing value".into()));
    };
    if let Some(n) = raw.as_i64() {
        return Ok(n);
    }
    if let Some(f) = raw.as_f64() {
        return whole_number(f).ok_or_else(invalid);
    }
    if let Some(s) = raw.as_str() {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Ok(n);
        }
        return s
            .parse::<f64>()
            .ok()
            .and_then(whole_number)
            .ok_or_else(invalid);
    }
    Err(invalid())
}

fn whole_number(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Moves a student to `to_group`. Returns `false` when the student already
/// sits in that group. Membership is never duplicated or dropped.
pub fn move_student(groups: &mut [Group], student_id: &str, to_group: usize) -> RosterResult<bool> {
    if to_group >= groups.len() {
        return Err(RosterError::InvalidParameter(format!(
            "group index {} out of range (0..{})",
            to_group,
            groups.len()
        )));
    }
    let Some((from_group, pos)) = groups.iter().enumerate().find_map(|(gi, g)| {
        g.students
            .iter()
            .position(|s| s.id == student_id)
            .map(|si| (gi, si))
    }) else {
        return Err(RosterError::not_found("student", student_id));
    };
    if from_group == to_group {
        return Ok(false);
    }

    let student = groups[from_group].students.remove(pos);
    groups[to_group].students.push(student);
    Ok(true)
}

pub fn rename_group(groups: &mut [Group], index: usize, name: &str) -> RosterResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RosterError::InvalidParameter(
            "group name must not be empty".into(),
        ));
    }
    let Some(group) = groups.get_mut(index) else {
        return Err(RosterError::InvalidParameter(format!(
            "group index {} out of range (0..{})",
            index,
            groups.len()
        )));
    };
    group.name = name.to_string();
    Ok(())
}

/// Positions become ids again, as they are on every save.
pub fn reindex(groups: &mut [Group]) {
    for (i, g) in groups.iter_mut().enumerate() {
        g.id = i;
    }
}
