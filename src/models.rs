// Data models for the task store

use crate::record::Record;
use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TASKS_KEY: &str = "@task_manager/tasks";
pub const CATEGORIES_KEY: &str = "@task_manager/categories";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Tint colour used when rendering the priority badge
    pub fn color(self) -> &'static str {
        match self {
            Priority::High => "#EF4444",
            Priority::Medium => "#F59E0B",
            Priority::Low => "#22C55E",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            other => Err(eyre!("Invalid priority: {} (expected high, medium or low)", other)),
        }
    }
}

/// A user-created to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    /// Category id; may point at a category that no longer exists
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub(crate) fn from_new(id: String, new: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            priority: new.priority,
            completed: new.completed,
            due_date: new.due_date,
            category: new.category,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a patch into this task and stamp `updated_at`
    pub(crate) fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        self.updated_at = now;
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn storage_key() -> &'static str {
        TASKS_KEY
    }
}

/// Task fields supplied by the caller when creating a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: String,
}

/// Partial update for a task
///
/// `due_date` is doubly optional: `None` leaves it alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub category: Option<String>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A named, coloured tag used to group tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Record for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn storage_key() -> &'static str {
        CATEGORIES_KEY
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
}

/// Categories seeded on first run
pub fn default_categories() -> Vec<Category> {
    [("1", "Work", "#0a7ea4"), ("2", "Personal", "#22C55E"), ("3", "Shopping", "#F59E0B")]
        .into_iter()
        .map(|(id, name, color)| Category {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> Task {
        let created = Utc.with_ymd_and_hms(2026, 2, 6, 18, 44, 10).unwrap();
        Task {
            id: "t1".to_string(),
            title: "Buy milk".to_string(),
            description: String::new(),
            priority: Priority::Low,
            completed: false,
            due_date: None,
            category: "3".to_string(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_priority_serialization() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&Priority::Low).unwrap(), "\"low\"");
        let p: Priority = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(p, Priority::Medium);
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("m".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_task_uses_camel_case_fields() {
        let json = serde_json::to_value(sample_task()).unwrap();
        assert_eq!(json["dueDate"], serde_json::Value::Null);
        assert_eq!(json["createdAt"], "2026-02-06T18:44:10Z");
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_task_reads_millisecond_timestamps() {
        let json = r#"{"id":"1770403450123","title":"Call mom","description":"","priority":"high",
            "completed":true,"dueDate":"2026-02-07T00:00:00.000Z","category":"2",
            "createdAt":"2026-02-06T18:44:10.123Z","updatedAt":"2026-02-06T18:45:00.456Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, Priority::High);
        assert!(task.completed);
        assert!(task.due_date.is_some());
        assert!(task.updated_at > task.created_at);
    }

    #[test]
    fn test_apply_patch_keeps_identity() {
        let mut task = sample_task();
        let later = task.created_at + chrono::Duration::seconds(5);
        task.apply(
            TaskPatch {
                title: Some("Buy oat milk".to_string()),
                due_date: Some(Some(later)),
                ..TaskPatch::default()
            },
            later,
        );

        assert_eq!(task.id, "t1");
        assert_eq!(task.title, "Buy oat milk");
        assert_eq!(task.due_date, Some(later));
        assert_eq!(task.updated_at, later);
        assert!(task.created_at < task.updated_at);

        task.apply(
            TaskPatch {
                due_date: Some(None),
                ..TaskPatch::default()
            },
            later,
        );
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch::completed(true).is_empty());
    }

    #[test]
    fn test_default_categories() {
        let categories = default_categories();
        let ids: Vec<&str> = categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(categories[2].name, "Shopping");
    }
}
