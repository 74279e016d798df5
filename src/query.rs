//! Filter/Query View
//!
//! Pure computations over a task list. Input order is always preserved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Task, TaskFilter};

/// Tasks satisfying every dimension of `filter`, in input order
pub fn apply(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    tasks.iter().filter(|t| filter.matches(t)).cloned().collect()
}

/// Aggregate counters shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Tasks whose due date is already past, completed or not
    pub overdue: usize,
    /// Rounded percentage of completed tasks
    pub completion_rate: u8,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count();

        Self {
            total,
            completed,
            pending: total - completed,
            overdue,
            completion_rate: completion_rate(completed, total),
        }
    }
}

fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Per-category counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

pub fn category_stats(tasks: &[Task], category_id: &str) -> CategoryStats {
    let (total, completed) = tasks
        .iter()
        .filter(|t| t.category == category_id)
        .fold((0, 0), |(total, done), t| (total + 1, done + usize::from(t.completed)));

    CategoryStats {
        total,
        completed,
        pending: total - completed,
    }
}
