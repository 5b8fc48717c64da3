use crate::error::RosterResult;
use crate::history::HistoryRecorder;
use crate::model::Class;
use crate::store::KeyValueStore;

const STUDENTS_HEADER: &str = "Class Name,Student Name,Present,Capability Level";
const GROUPINGS_HEADER: &str =
    "Class Name,Grouping Timestamp,Grouping Method,Grouping Value,Group Details";

/// Two CSV sections separated by a blank line: every student per class,
/// then every saved grouping per class.
pub fn roster_csv(classes: &[Class], store: &dyn KeyValueStore) -> RosterResult<String> {
    let mut students = vec![STUDENTS_HEADER.to_string()];
    for class in classes {
        let class_name = csv_quote(&class.name);
        if class.students.is_empty() {
            students.push(format!("{},,,", class_name));
            continue;
        }
        for s in &class.students {
            students.push(format!(
                "{},{},{},{}",
                class_name,
                csv_quote(&s.name),
                if s.present { "Yes" } else { "No" },
                s.capability_level.as_str()
            ));
        }
    }

    let history = HistoryRecorder::new(store);
    let mut groupings = vec![GROUPINGS_HEADER.to_string()];
    for class in classes {
        let class_name = csv_quote(&class.name);
        let entries = history.load(&class.id)?;
        if entries.is_empty() {
            groupings.push(format!("{},,,,", class_name));
            continue;
        }
        for entry in entries {
            let details = entry
                .groups
                .iter()
                .enumerate()
                .map(|(i, g)| {
                    let names: Vec<&str> = g.students.iter().map(|s| s.name.as_str()).collect();
                    format!("Group {}: {}", i + 1, names.join(" / "))
                })
                .collect::<Vec<_>>()
                .join(" | ");
            groupings.push(format!(
                "{},{},{},{},{}",
                class_name,
                csv_quote(&entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
                entry.method.as_str(),
                entry.value,
                csv_quote(&details)
            ));
        }
    }

    Ok(format!("{}\n\n{}", students.join("\n"), groupings.join("\n")))
}

// Always quoted; inner quotes doubled.
fn csv_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
