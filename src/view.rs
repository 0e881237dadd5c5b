// Derived, read-only views over the task collections

use crate::models::{Category, Task};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Task counts; never persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl Stats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
        }
    }
}

/// Category selection on the task list; no selection shows everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(id) => task.category == *id,
        }
    }
}

impl From<Option<String>> for CategoryFilter {
    fn from(selection: Option<String>) -> Self {
        selection.map_or(CategoryFilter::All, CategoryFilter::Only)
    }
}

/// Tasks passing `filter`, newest `created_at` first
///
/// The sort is stable: tasks created at the same instant keep their
/// collection order.
pub fn visible_tasks<'a>(tasks: &'a [Task], filter: &CategoryFilter) -> Vec<&'a Task> {
    let mut visible: Vec<&Task> = tasks.iter().filter(|t| filter.matches(t)).collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    visible
}

/// Display name for a category id; dangling ids read as uncategorized
pub fn category_label<'a>(categories: &'a [Category], id: &str) -> &'a str {
    categories
        .iter()
        .find(|c| c.id == id)
        .map_or(UNCATEGORIZED, |c| c.name.as_str())
}

pub fn due_label(due: Option<DateTime<Utc>>, today: NaiveDate) -> String {
    let Some(due) = due else {
        return "No due date".to_string();
    };

    let date = due.date_naive();
    if date == today {
        "Today".to_string()
    } else if today.checked_add_days(Days::new(1)) == Some(date) {
        "Tomorrow".to_string()
    } else {
        date.format("%b %-d").to_string()
    }
}

/// Parse `#RRGGBB` into its components
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
