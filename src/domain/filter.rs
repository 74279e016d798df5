//! Task Filters
//!
//! Every dimension defaults to "all", which never excludes a task.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::category::Category;
use super::task::{Priority, Task};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {dimension} filter: {value}")]
pub struct ParseFilterError {
    dimension: &'static str,
    value: String,
}

/// Completion status dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed,
            StatusFilter::Pending => !task.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "pending" => Ok(StatusFilter::Pending),
            _ => Err(ParseFilterError { dimension: "status", value: s.to_string() }),
        }
    }
}

/// Priority dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(p) => task.priority == *p,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PriorityFilter::All);
        }
        Priority::parse(s)
            .map(PriorityFilter::Only)
            .ok_or_else(|| ParseFilterError { dimension: "priority", value: s.to_string() })
    }
}

/// Category dimension; holds a category id (or a name before resolution)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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

impl FromStr for CategoryFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseFilterError { dimension: "category", value: s.to_string() });
        }
        if s.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(s.to_string()))
        }
    }
}

/// All filter dimensions, combined conjunctively
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub priority: PriorityFilter,
    #[serde(default)]
    pub category: CategoryFilter,
    /// Case-insensitive substring of title or description
    #[serde(default)]
    pub search: Option<String>,
    /// Keep only tasks due on this day (tasks without a due date are kept)
    #[serde(default)]
    pub due_on: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn priority(mut self, priority: PriorityFilter) -> Self {
        self.priority = priority;
        self
    }

    pub fn category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn due_on(mut self, day: NaiveDate) -> Self {
        self.due_on = Some(day);
        self
    }

    /// True when no dimension excludes anything
    pub fn is_default(&self) -> bool {
        self.status == StatusFilter::All
            && self.priority == PriorityFilter::All
            && self.category == CategoryFilter::All
            && self.search.as_deref().map_or(true, |q| q.trim().is_empty())
            && self.due_on.is_none()
    }

    /// Every dimension must hold (conjunctive)
    pub fn matches(&self, task: &Task) -> bool {
        self.status.matches(task)
            && self.priority.matches(task)
            && self.category.matches(task)
            && self.matches_search(task)
            && self.matches_due_on(task)
    }

    fn matches_search(&self, task: &Task) -> bool {
        let query = match self.search.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_lowercase(),
            _ => return true,
        };
        task.title.to_lowercase().contains(&query)
            || task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }

    fn matches_due_on(&self, task: &Task) -> bool {
        match (self.due_on, task.due_date) {
            (Some(day), Some(due)) => due.date_naive() == day,
            _ => true,
        }
    }

    /// Replace a category given by name with that category's id.
    ///
    /// A value that already is a known id, or matches no category, is kept.
    pub fn resolve_category(mut self, categories: &[Category]) -> Self {
        if let CategoryFilter::Only(value) = &self.category {
            if !categories.iter().any(|c| c.id == *value) {
                if let Some(found) = categories.iter().find(|c| c.has_name(value)) {
                    self.category = CategoryFilter::Only(found.id.clone());
                }
            }
        }
        self
    }

    /// Short label of the active dimensions, e.g. "completed, high"
    pub fn describe(&self, categories: &[Category]) -> String {
        let mut parts: Vec<String> = Vec::new();
        match self.status {
            StatusFilter::All => {}
            StatusFilter::Completed => parts.push("completed".into()),
            StatusFilter::Pending => parts.push("pending".into()),
        }
        if let PriorityFilter::Only(p) = self.priority {
            parts.push(p.as_str().into());
        }
        if let CategoryFilter::Only(id) = &self.category {
            let label = categories
                .iter()
                .find(|c| c.id == *id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| id.clone());
            parts.push(label);
        }
        if let Some(q) = self.search.as_deref().filter(|q| !q.trim().is_empty()) {
            parts.push(format!("\"{}\"", q.trim()));
        }
        if let Some(day) = self.due_on {
            parts.push(format!("due {}", day));
        }

        if parts.is_empty() {
            "all tasks".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.into(),
            name: name.into(),
            color: "#007AFF".into(),
            icon: "tag".into(),
            owner: "u1".into(),
        }
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!("Completed".parse::<StatusFilter>(), Ok(StatusFilter::Completed));
        assert_eq!("all".parse::<PriorityFilter>(), Ok(PriorityFilter::All));
        assert_eq!("low".parse::<PriorityFilter>(), Ok(PriorityFilter::Only(Priority::Low)));
        assert!("urgent".parse::<PriorityFilter>().is_err());
        assert!("done".parse::<StatusFilter>().is_err());
        assert_eq!("c1".parse::<CategoryFilter>(), Ok(CategoryFilter::Only("c1".into())));
    }

    #[test]
    fn test_resolve_category_by_name() {
        let cats = vec![category("c1", "Work"), category("c2", "Home")];

        let filter = TaskFilter::default()
            .category(CategoryFilter::Only("home".into()))
            .resolve_category(&cats);
        assert_eq!(filter.category, CategoryFilter::Only("c2".into()));

        let filter = TaskFilter::default()
            .category(CategoryFilter::Only("c1".into()))
            .resolve_category(&cats);
        assert_eq!(filter.category, CategoryFilter::Only("c1".into()));
    }

    #[test]
    fn test_describe() {
        let cats = vec![category("c1", "Work")];
        assert_eq!(TaskFilter::default().describe(&cats), "all tasks");

        let filter = TaskFilter::default()
            .status(StatusFilter::Pending)
            .priority(PriorityFilter::Only(Priority::High))
            .category(CategoryFilter::Only("c1".into()));
        assert_eq!(filter.describe(&cats), "pending, high, Work");
    }

    #[test]
    fn test_blank_search_is_default() {
        let filter = TaskFilter::default().search("   ");
        assert!(filter.is_default());
    }
}
