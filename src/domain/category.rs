//! Category Entity
//!
//! Categories group tasks. Names are unique per owner, ignoring case.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

/// A category for grouping tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: String,
    /// Category name
    pub name: String,
    /// Color token (e.g. "#FF9500")
    pub color: String,
    /// Glyph token
    pub icon: String,
    pub owner: String,
}

impl Category {
    /// Case-insensitive name comparison
    pub fn has_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

impl Entity for Category {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Input for creating a category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub icon: String,
    /// Falls back to the session owner when absent
    pub owner: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, color: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            icon: icon.into(),
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}
