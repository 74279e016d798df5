//! Backend Row Shapes
//!
//! Rows use the backend's snake_case column names. Every field of a fetched
//! row tolerates absence, `null` and a wrong JSON type, so one malformed
//! column never fails the row.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Field decoders that fall back to `None`/empty instead of failing
mod lenient {
    use super::*;

    /// Strings as-is, numbers as their decimal text; anything else is empty
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(id(d)?.unwrap_or_default())
    }

    /// Strings and numbers; used for id-like columns
    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    /// Booleans, plus 0/1 as some SQL backends send them
    pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => Some(b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        })
    }

    /// Numbers, or numeric strings as sent for `numeric` columns
    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }
}

/// Logical backend tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Tasks,
    Categories,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Tasks => "tasks",
            Table::Categories => "categories",
        }
    }
}

/// A task row as stored by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRow {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::opt_bool")]
    pub completed: Option<bool>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub priority: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub due_date: Option<String>,
    #[serde(deserialize_with = "lenient::id")]
    pub category_id: Option<String>,
    /// Legacy column some rows carry instead of `category_id`
    #[serde(deserialize_with = "lenient::id")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient::id")]
    pub user_id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub location_lat: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub location_lng: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub location_address: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub updated_at: Option<String>,
}

/// Columns written on insert or update. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<TaskRowPatch> for TaskRow {
    fn from(patch: TaskRowPatch) -> Self {
        Self {
            id: String::new(),
            title: patch.title.unwrap_or_default(),
            description: patch.description,
            completed: patch.completed,
            priority: patch.priority,
            due_date: patch.due_date,
            category_id: patch.category_id,
            category: None,
            user_id: patch.user_id,
            image_url: patch.image_url,
            location_lat: patch.location_lat,
            location_lng: patch.location_lng,
            location_address: patch.location_address,
            created_at: None,
            updated_at: patch.updated_at,
        }
    }
}

/// A category row as stored by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRow {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub color: String,
    #[serde(deserialize_with = "lenient::text")]
    pub icon: String,
    #[serde(deserialize_with = "lenient::id")]
    pub user_id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub created_at: Option<String>,
}

/// Columns written when inserting a category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCategoryRow {
    pub name: String,
    pub color: String,
    pub icon: String,
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_row_decodes() {
        let row: TaskRow = serde_json::from_str(r#"{"id":"1","title":"Buy milk"}"#).unwrap();
        assert_eq!(row.id, "1");
        assert!(row.completed.is_none());
        assert!(row.category_id.is_none());
    }

    #[test]
    fn test_malformed_fields_decode_to_none() {
        let row: TaskRow = serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": null,
            "completed": 1,
            "priority": 3,
            "due_date": 1704067200,
            "category_id": "c1",
            "location_lat": "-23.5",
            "location_lng": {"deg": 46},
            "created_at": false
        }))
        .unwrap();

        assert_eq!(row.id, "7");
        assert_eq!(row.title, "");
        assert_eq!(row.completed, Some(true));
        assert!(row.priority.is_none());
        assert!(row.due_date.is_none());
        assert_eq!(row.category_id.as_deref(), Some("c1"));
        assert_eq!(row.location_lat, Some(-23.5));
        assert!(row.location_lng.is_none());
        assert!(row.created_at.is_none());
    }

    #[test]
    fn test_null_category_columns_decode_empty() {
        let row: CategoryRow = serde_json::from_str(
            r#"{"id":"c1","name":"Work","color":null,"icon":42,"user_id":"u1"}"#,
        )
        .unwrap();
        assert_eq!(row.name, "Work");
        assert_eq!(row.color, "");
        assert_eq!(row.icon, "42");
        assert_eq!(row.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let patch = TaskRowPatch {
            completed: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"completed": true}));
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Table::Tasks.as_str(), "tasks");
        assert_eq!(Table::Categories.as_str(), "categories");
    }
}
